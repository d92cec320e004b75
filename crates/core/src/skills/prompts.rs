//! Default system prompts bundled at compile time.

/// Interviewer - scores answers and picks the next move
pub const INTERVIEWER: &str = include_str!("defaults/interviewer.md");

/// Block auditor - scores a block of interview answers
pub const BLOCK_AUDITOR: &str = include_str!("defaults/block_auditor.md");

/// Researcher - builds the evidence base for the application
pub const RESEARCHER: &str = include_str!("defaults/researcher.md");

/// Writer - drafts the application
pub const WRITER: &str = include_str!("defaults/writer.md");

/// Auditor - reviews the draft like a funding committee
pub const AUDITOR: &str = include_str!("defaults/auditor.md");

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("interviewer", INTERVIEWER),
        ("block_auditor", BLOCK_AUDITOR),
        ("researcher", RESEARCHER),
        ("writer", WRITER),
        ("auditor", AUDITOR),
    ]
}

/*!
 * Validation of subtitle inputs before anything is written.
 *
 * - `sync`: same-directory rule and cross-language timestamp synchronization
 * - `report`: structured issue collection and grouped text reports
 * - `preflight`: advisory memory and file-size checks with user confirmation
 */

pub mod preflight;
pub mod report;
pub mod sync;

// Re-export main types
pub use preflight::{AlwaysConfirm, AlwaysDecline, ConfirmPrompt, MemoryProbe, SystemMemory};
pub use report::{IssueGroup, ValidationIssue, ValidationReport};
pub use sync::{validate_files, validate_same_directory, validate_timestamp_sync};

//! Error types for the curator CLI application.
//!
//! The CLI fails either inside the pipeline library or while prompting the user. Every variant is
//! transparent so the underlying message reaches the user unchanged.

use thiserror::Error;

/// Errors that can occur during CLI operations.
///
/// # Examples
///
/// ```no_run
/// use curator::config::Config;
/// use curator_cli::errors::CuratorCliError;
///
/// # fn example() -> Result<(), CuratorCliError> {
/// // Library failures convert with `?`
/// let config = Config::load_or_default(None)?;
///
/// // So do prompts
/// let overwrite = dialoguer::Confirm::new().with_prompt("Overwrite?").interact()?;
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum CuratorCliError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the underlying curator library
  #[error(transparent)]
  Curator(#[from] curator::errors::CuratorError),
}

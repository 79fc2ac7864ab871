pub mod codegen;
pub mod parser;

/// KaleidoError is the top-level error type of the compiler driver.
#[derive(thiserror::Error, Debug)]
pub enum KaleidoError {
	/// Internal compiler error, should never happen
	#[error("InternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	#[error("{0} top-level forms failed")]
	CompileErrors(usize),
}

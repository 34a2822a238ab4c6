//! External `addr2line` translator.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{parse_translator_output, LineInfo, LineTranslator};
use crate::error::TranslatorError;
use crate::types::Address;

/// Program spawned when none is configured.
pub const DEFAULT_PROGRAM: &str = "addr2line";

/// Spawns `<program> -C -f -p -e <module> <addr>...` once per module.
///
/// Standard error is discarded. The call blocks until the process exits; no
/// timeout is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addr2LineProcess
{
    program: String,
}

impl Addr2LineProcess
{
    pub fn new(program: impl Into<String>) -> Self
    {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str
    {
        &self.program
    }
}

impl Default for Addr2LineProcess
{
    fn default() -> Self
    {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl LineTranslator for Addr2LineProcess
{
    fn translate(&self, module: &Path, addresses: &[Address]) -> Result<Vec<LineInfo>, TranslatorError>
    {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let output = Command::new(&self.program)
            .args(["-C", "-f", "-p", "-e"])
            .arg(module)
            .args(addresses.iter().map(Address::to_string))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| TranslatorError::Unavailable {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranslatorError::Failed {
                module: module.to_path_buf(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            program = %self.program,
            module = %module.display(),
            addresses = addresses.len(),
            "translator finished"
        );
        Ok(parse_translator_output(&stdout))
    }
}

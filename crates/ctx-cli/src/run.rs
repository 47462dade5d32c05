//! One encrypt or decrypt pass over stdin.
//!
//! Encryption reads raw bytes; decryption reads the base64 text a previous
//! encrypt produced in its `payload` field. The result is written to stdout
//! as a single JSON document: [`OpResponse`] on success, [`ErrorResponse`]
//! otherwise.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cipher_ctx::{CipherContext, ProviderState, SoftProvider};
use common::{
    protocol::{ErrorResponse, OpResponse, Operation},
    Buffer, ErrorKind,
};
use tracing::{info, warn};

use crate::config::Config;

/// Build a context from `cfg`, run `operation` over stdin, and print the
/// result.
///
/// Returns `Ok(false)` when the operation failed and an [`ErrorResponse`] was
/// printed.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
pub fn run(cfg: &Config, operation: Operation) -> Result<bool> {
    let mechanism = cfg.mechanism()?;
    let state = ProviderState::new(Arc::new(SoftProvider::new()), mechanism);

    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("failed to read stdin")?;

    let result = CipherContext::with_state(&state, &cfg.key_source())
        .map_err(|e| ErrorResponse::from(ErrorKind::from(e)))
        .and_then(|ctx| execute(&ctx, operation, &input));

    let mut stdout = io::stdout().lock();
    let ok = match &result {
        Ok(resp) => {
            info!(?operation, len = resp.len, %mechanism, "operation complete");
            serde_json::to_writer(&mut stdout, resp)?;
            true
        }
        Err(err) => {
            warn!(?operation, code = %err.code, "operation failed");
            serde_json::to_writer(&mut stdout, err)?;
            false
        }
    };
    writeln!(stdout).context("failed to write stdout")?;
    Ok(ok)
}

/// Apply `operation` to `input` with `ctx`.
pub fn execute(
    ctx: &CipherContext,
    operation: Operation,
    input: &[u8],
) -> Result<OpResponse, ErrorResponse> {
    let output = match operation {
        Operation::Encrypt => ctx.encrypt(&Buffer::copy_from_slice(input)),
        Operation::Decrypt => {
            let text = std::str::from_utf8(input).map_err(|e| {
                ErrorResponse::new(
                    ErrorKind::InvalidArgument.code(),
                    format!("input is not valid UTF-8 base64 text: {e}"),
                )
            })?;
            let raw = STANDARD.decode(text.trim()).map_err(|e| {
                ErrorResponse::new(
                    ErrorKind::InvalidArgument.code(),
                    format!("input is not valid base64: {e}"),
                )
            })?;
            ctx.decrypt(&Buffer::from(raw))
        }
    }
    .map_err(ErrorResponse::from)?;

    Ok(OpResponse {
        operation,
        payload: STANDARD.encode(output.as_slice()),
        len: output.len(),
    })
}

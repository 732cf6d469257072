use std::fmt::Display;
use std::thread;
use std::time::Duration;

/// Runs `op` up to `attempts` times, sleeping `delay` between failures.
///
/// `op` receives the 1-based attempt number. The last error is returned
/// once all attempts are used. `attempts` of 0 is treated as 1.
pub fn with_retry<T, E, F>(attempts: usize, delay: Duration, what: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(usize) -> Result<T, E>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                log::warn!("{what} failed (attempt {attempt}/{attempts}): {e}");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                log::error!("{what} failed after {attempts} attempt(s): {e}");
                return Err(e);
            }
        }
    }
}

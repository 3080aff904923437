/// Turns a `Result` into an `Option`, logging the error at error level.
pub trait ResultOkLogExt<T, E> {
    /// `context` prefixes the logged error, e.g. `"failed to push to webhook"`.
    fn ok_log(self, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{context}: {err}");
                None
            }
        }
    }
}

use dispatch::error::DispatchError;

/// `sqlx::Error::RowNotFound` only ever surfaces here from a `fetch_one`
/// call, which every query in this crate avoids in favour of
/// `fetch_optional` — so in practice every call site maps straight to
/// `Internal`. Kept as an explicit match anyway since a future `fetch_one`
/// call site should get `NotFound` for free.
pub fn convert_error(error: sqlx::Error) -> DispatchError {
    match error {
        sqlx::Error::RowNotFound => DispatchError::NotFound,
        other => DispatchError::internal(other),
    }
}

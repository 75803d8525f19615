pub mod cursor;
pub mod diagnostics;
pub mod manager;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod rls;

pub use cursor::{decode_cursor, encode_cursor, CursorKey};
pub use diagnostics::{Diagnostics, SqlError};
pub use manager::{DatabaseError, DatabaseHealthCheck, DatabaseManager};
pub use pagination::{paginate, Keyset, PageLimit, PaginatedResult};
pub use rls::{RlsClient, RlsError};

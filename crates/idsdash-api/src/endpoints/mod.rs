// Endpoint groups of the dashboard backend
//
// Each file adds inherent methods to `ApiClient` for one area of the
// `/api` surface. They are thin typed wrappers over the generic
// request primitive in `client.rs`.

mod alerts;
mod blocks;
mod devices;
mod logs;
mod ops;
mod scan;
mod session;
mod settings;
mod trusted;

pub(crate) mod download;

pub use ops::DEFAULT_BACKUP_NAME;

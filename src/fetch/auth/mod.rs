mod header;

pub use header::StaticHeader;

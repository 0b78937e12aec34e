//! End-to-end checks across `hostpin-core` and `hostpin-common`.

mod hosts_file;
mod probing;

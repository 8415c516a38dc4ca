mod whoami;

pub use whoami::whoami_get;

#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod database;
pub mod query;

pub mod error {
    pub use rdf_bucket_common::error::*;
}

pub mod model {
    pub use rdf_bucket_model::*;
}

pub mod common {
    pub use rdf_bucket_common::*;
}

pub mod encoding {
    pub use rdf_bucket_encoding::*;
}

pub mod storage {
    pub use rdf_bucket_storage::*;
}

pub mod logical {
    pub use rdf_bucket_logical::*;
}

pub mod physical {
    pub use rdf_bucket_physical::*;
}

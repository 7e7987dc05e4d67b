//! Generic record store: whitelisted CRUD, slug derivation, and typed list
//! queries over the content tables.

mod crud;
mod error;
mod query;
mod record;
pub mod slug;

pub use crud::ContentStore;
pub use error::StoreError;
pub use query::{bind_all, build_list_query, BindValue, ListQuery, ListStatements, PredicateList};
pub use record::{
    bind_from_json, filter_allowed_fields, page_meta, publish_transition, record_from_row,
    ContentRecord, ListPage, Pagination, PublishStamp,
};

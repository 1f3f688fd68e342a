//! Inverted list storage.
//!
//! The [`InvertedListStore`] maps `(index_id, list_id)` to the ordered
//! entries of that list inside the shared [`INDEX_TABLE`], and hands out
//! [`ListCursor`]s that filter entries with a pushed-down [`RowPredicate`].

mod inverted_list;

pub use inverted_list::{
    Assignment, InvertedListStore, ListCursor, ListEntry, ListFilter, RowPredicate, RowView,
    INDEX_TABLE,
};

use serde::Deserialize;

/// `{ data, message }` envelope used by the chat backend for successful
/// responses. Only `data` is read.
#[derive(Debug, Deserialize)]
pub struct SuccessData<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Items { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Items { items } => items,
            ListBody::Bare(items) => items,
        }
    }
}

/// Every list shape the backend is known to return:
/// `{data: {items}}`, `{data: [..]}`, `{items}` and a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Wrapped(SuccessData<ListBody<T>>),
    Unwrapped(ListBody<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Wrapped(envelope) => envelope.data.into_items(),
            ListResponse::Unwrapped(body) => body.into_items(),
        }
    }
}

/// Single-item responses: `{data: T}` or bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemResponse<T> {
    Wrapped(SuccessData<T>),
    Bare(T),
}

impl<T> ItemResponse<T> {
    pub fn into_inner(self) -> T {
        match self {
            ItemResponse::Wrapped(envelope) => envelope.data,
            ItemResponse::Bare(item) => item,
        }
    }
}

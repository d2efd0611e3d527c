//! Errors returned by [`SimContext`](crate::SimContext) accessors.

use thiserror::Error;

use crate::props::PropKind;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("no {0} prop in the scene")]
    MissingProp(PropKind),
    #[error("{0} body is not in the physics world")]
    BodyNotInWorld(PropKind),
}

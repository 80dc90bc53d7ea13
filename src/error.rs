use std::time::Duration;
use thiserror::Error;

use crate::graph::{EdgeIx, VertexId, VertexIx};

/// Structural failures of the road network itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("vertex {0} is not part of the graph")]
    UnknownVertex(VertexId),

    #[error("edge {0} is not part of the graph")]
    UnknownEdge(usize),

    #[error("vertex {0} was declared twice")]
    DuplicateVertex(VertexId),

    #[error("vertices {0:?} and {1:?} are not adjacent")]
    NotAdjacent(VertexIx, VertexIx),
}

/// Failures raised while interpreting an edge sequence as a path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("a path needs at least {required} edges, got {given}")]
    TooShort { required: usize, given: usize },

    #[error("edge {edge:?} at position {index} does not continue the path")]
    Disconnected { index: usize, edge: EdgeIx },

    #[error("discretization produced no trajectory points")]
    EmptyTrajectory,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures of a query round.
///
/// A rejected query is not an error: it is reported through the
/// query outcome. Only corrupted inputs and timeouts end up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("search exceeded its deadline after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures of the flat-file collaborators.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("could not read input: {0}")]
    Read(#[from] std::io::Error),

    #[error("malformed line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// The crate-wide error, unifying every submodule error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

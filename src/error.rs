use thiserror::Error;

use crate::{agent::AgentId, land::LandId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("grid must have a positive width and height (got {width}x{height})")]
    EmptyGrid { width: u32, height: u32 },

    #[error("{agents} landholders do not fit on a grid of {capacity} cells")]
    TooManyLandholders { agents: usize, capacity: usize },

    #[error("expected {expected} land unit records, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },

    #[error("land unit record {0:?} has a non-positive size")]
    InvalidLandSize(LandId),

    #[error("landholder {0} appears more than once")]
    DuplicateLandholder(AgentId),

    #[error("landholder id {0} is reserved for the nature reserve")]
    ReservedLandholderId(AgentId),

    #[error("landholder {id} is placed off-grid at ({x}, {y})")]
    LandholderOffGrid { id: AgentId, x: u32, y: u32 },

    #[error("land unit {unit:?} is owned by unknown landholder {owner}")]
    UnknownOwner { unit: LandId, owner: AgentId },

    #[error("landholder {id} has unknown type code {code}")]
    UnknownFarmerType { id: AgentId, code: u8 },

    #[error("landholder {id} has unknown business category code {code}")]
    UnknownBusiness { id: AgentId, code: u8 },

    #[error("landholder not found: {0}")]
    LandholderNotFound(AgentId),
}

pub type Result<T> = std::result::Result<T, ModelError>;

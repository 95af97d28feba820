//! Socket descriptors for the node system.
//!
//! Each node declares its sockets (inputs/outputs) by name and type. The
//! graph uses these to validate edge connections.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plugins::DataKind;

/// The kind of data flowing through a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    Image,
    Mask,
    /// Wildcard, accepts and connects to anything
    Any,
}

impl SocketType {
    /// Whether an output of type `self` may feed an input of type `other`.
    ///
    /// Equal types connect, and `Any` on either side connects. There is no
    /// implicit coercion, so the relation is symmetric.
    pub fn is_compatible_with(self, other: SocketType) -> bool {
        self == other || self == SocketType::Any || other == SocketType::Any
    }

    pub fn all() -> &'static [SocketType] {
        &[SocketType::Image, SocketType::Mask, SocketType::Any]
    }
}

impl From<DataKind> for SocketType {
    fn from(kind: DataKind) -> Self {
        match kind {
            DataKind::Image => SocketType::Image,
            DataKind::Mask => SocketType::Mask,
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketType::Image => "image",
            SocketType::Mask => "mask",
            SocketType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Whether a socket is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
    Input,
    Output,
}

/// Descriptor for one socket of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketDescriptor {
    pub name: String,
    pub direction: SocketDirection,
    pub socket_type: SocketType,
    /// Inputs only: the graph is not runnable while this is unconnected
    #[serde(default)]
    pub required: bool,
}

impl SocketDescriptor {
    pub fn input(name: &str, socket_type: SocketType) -> Self {
        Self {
            name: name.to_string(),
            direction: SocketDirection::Input,
            socket_type,
            required: true,
        }
    }

    pub fn optional_input(name: &str, socket_type: SocketType) -> Self {
        Self {
            required: false,
            ..Self::input(name, socket_type)
        }
    }

    pub fn output(name: &str, socket_type: SocketType) -> Self {
        Self {
            name: name.to_string(),
            direction: SocketDirection::Output,
            socket_type,
            required: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_table() {
        use SocketType::*;
        assert!(Image.is_compatible_with(Image));
        assert!(Mask.is_compatible_with(Mask));
        assert!(Image.is_compatible_with(Any));
        assert!(Any.is_compatible_with(Mask));
        assert!(Any.is_compatible_with(Any));
        assert!(!Image.is_compatible_with(Mask));
        assert!(!Mask.is_compatible_with(Image));
    }

    #[test]
    fn test_compatibility_symmetric() {
        for &a in SocketType::all() {
            for &b in SocketType::all() {
                assert_eq!(a.is_compatible_with(b), b.is_compatible_with(a));
            }
        }
    }

    #[test]
    fn test_descriptors() {
        let input = SocketDescriptor::input("image", SocketType::Image);
        assert!(input.required);
        assert_eq!(input.direction, SocketDirection::Input);
        assert!(!SocketDescriptor::optional_input("hint", SocketType::Any).required);
        assert!(!SocketDescriptor::output("image", SocketType::Image).required);
    }
}

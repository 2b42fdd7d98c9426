use std::fmt;

/// An incoming connection of a network node.
#[derive(Clone, Copy, PartialEq)]
pub(super) struct Connection {
    /// Index of the source node.
    pub source: usize,
    pub weight: f32,
    /// Reads the source's value from the previous activation.
    pub recurrent: bool,
}

impl Connection {
    pub fn new(source: usize, weight: f32, recurrent: bool) -> Connection {
        Connection {
            source,
            weight,
            recurrent,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {:.9}",
            if self.recurrent { "~" } else { "" },
            self.source,
            self.weight
        )
    }
}

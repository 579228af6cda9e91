use std::fmt;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: String) -> Self {
                Self(id)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// Peer address of an accepted connection.
define_id!(ClientId);

define_id!(SessionId);

impl SessionId {
    /// Session ids are diagnostic only; they never drive protocol decisions.
    pub fn from_number(number: u64) -> Self {
        Self(format!("session_{}", number))
    }
}

impl From<std::net::SocketAddr> for ClientId {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

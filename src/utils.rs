use std::{future::Future, pin::Pin};

/// Boxed future returned by the client capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub fn to_pom_error<E: std::fmt::Display>(e: E, position: usize, msg: &'static str) -> pom::Error {
    pom::Error::Conversion {
        message: format!("{}: {}", msg, e),
        position,
    }
}

//! Per-request context — the request plus a type-erased extensions map.
//!
//! Middleware attaches per-request state (e.g. the resolved cache key) to the
//! [`Extensions`] map so downstream layers can read it without the layers
//! knowing about each other's concrete types.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions map — used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a value into the extensions map
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Remove a value from the extensions map
    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// Per-request context handed through the middleware chain.
pub struct Context {
    request: Request,
    extensions: Extensions,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u32);

    fn make_context() -> Context {
        let raw = b"GET /x HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        Context::new(req)
    }

    #[test]
    fn extensions_roundtrip() {
        let mut ctx = make_context();
        ctx.extensions_mut().insert(Marker(7));
        assert_eq!(ctx.extensions().get::<Marker>(), Some(&Marker(7)));
        assert_eq!(ctx.extensions_mut().remove::<Marker>(), Some(Marker(7)));
        assert_eq!(ctx.extensions().get::<Marker>(), None);
    }

    #[test]
    fn missing_extension_is_none() {
        let ctx = make_context();
        assert_eq!(ctx.extensions().get::<Marker>(), None);
    }
}

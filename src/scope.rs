//! Request scoped values.
//!
//! Instead of looking objects up in a global container, every request
//! carries its own [`RequestScope`]. Values are bound either ready-made or
//! through a provider which runs at most once, the first time the value is
//! looked up during the request. [`RequestModule`]s populate the scope of
//! each new request.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use once_cell::sync::OnceCell;

type Instance = Arc<dyn Any + Send + Sync>;

/// Lookup key of a request scoped value: its type and an optional qualifier
pub struct Key<T: ?Sized> {
    name: Option<&'static str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Key<T> {
    pub fn get() -> Self {
        Key {
            name: None,
            _marker: PhantomData,
        }
    }

    pub fn named(name: &'static str) -> Self {
        Key {
            name: Some(name),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    fn id(&self) -> KeyId {
        KeyId {
            ty: TypeId::of::<T>(),
            name: self.name,
        }
    }
}

impl<T: ?Sized> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Key<T> {}

impl<T: ?Sized> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("type", &std::any::type_name::<T>())
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct KeyId {
    ty: TypeId,
    name: Option<&'static str>,
}

enum Binding {
    Instance(Instance),
    Provider {
        cell: OnceCell<Instance>,
        provider: Box<dyn Fn() -> Instance + Send + Sync>,
    },
}

impl Binding {
    fn resolve(&self) -> Instance {
        match self {
            Binding::Instance(instance) => instance.clone(),
            Binding::Provider { cell, provider } => cell.get_or_init(|| provider()).clone(),
        }
    }
}

/// Values scoped to a single request
#[derive(Default)]
pub struct RequestScope {
    bindings: HashMap<KeyId, Binding>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a ready value, replacing any previous binding of the key
    pub fn bind<T>(&mut self, key: Key<T>, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.bind_arc(key, Arc::new(value))
    }

    pub fn bind_arc<T>(&mut self, key: Key<T>, value: Arc<T>) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.bindings.insert(key.id(), Binding::Instance(value));
        self
    }

    /// Bind a provider, called on first lookup only
    pub fn bind_lazy<T, F>(&mut self, key: Key<T>, provider: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bindings.insert(
            key.id(),
            Binding::Provider {
                cell: OnceCell::new(),
                provider: Box::new(move || Arc::new(provider()) as Instance),
            },
        );
        self
    }

    pub fn get<T>(&self, key: &Key<T>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.bindings.get(&key.id())?.resolve();
        match instance.downcast::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Request scoped value bound to {:?} has an unexpected type", key);
                None
            }
        }
    }

    pub fn contains<T>(&self, key: &Key<T>) -> bool
    where
        T: 'static,
    {
        self.bindings.contains_key(&key.id())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope").field("bindings", &self.bindings.len()).finish()
    }
}

/// Registers request scoped values on every new request
///
/// ```rust
/// # use grenat::scope::{Key, RequestModule, RequestScope};
/// struct DbSession(u32);
///
/// let module = |scope: &mut RequestScope| {
///     scope.bind_lazy(Key::<DbSession>::get(), || DbSession(1));
/// };
///
/// let mut scope = RequestScope::new();
/// module.configure(&mut scope);
/// assert_eq!(scope.get(&Key::<DbSession>::get()).unwrap().0, 1);
/// ```
pub trait RequestModule: Send + Sync {
    fn configure(&self, scope: &mut RequestScope);
}

impl<F> RequestModule for F
where
    F: Fn(&mut RequestScope) + Send + Sync,
{
    fn configure(&self, scope: &mut RequestScope) {
        (self)(scope)
    }
}

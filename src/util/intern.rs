use std::{collections::HashMap, fmt, hash::Hash, marker::PhantomData, num::NonZeroU32, rc::Rc};

/// A handle to some interned value of type `T`. To retrieve a `&T`, use
/// [`Interner::get`].
pub struct Interned<T: ?Sized> {
    // NonZeroU32 gives `Option<Interned<T>>` the same size as the handle.
    handle: NonZeroU32,
    _ty: PhantomData<T>,
}

impl<T: ?Sized> Interned<T> {
    const fn from_handle(handle: NonZeroU32) -> Self {
        Interned {
            handle,
            _ty: PhantomData,
        }
    }

    fn index(self) -> usize {
        (self.handle.get() - 1) as usize
    }
}

impl<T: ?Sized> Copy for Interned<T> {}

impl<T: ?Sized> Clone for Interned<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Hash for Interned<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T: ?Sized> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T: ?Sized> Eq for Interned<T> {}

impl<T: ?Sized> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interned({})", self.handle)
    }
}

/// Deduplicating storage. Interning the same value twice yields the same
/// handle; handles are only meaningful for the interner that produced them.
pub struct Interner<T: ?Sized> {
    map: HashMap<Rc<T>, NonZeroU32>,
    vec: Vec<Rc<T>>,
}

impl fmt::Debug for Interner<str> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, interned) in self.vec.iter().enumerate() {
            map.entry(&(i + 1), &interned);
        }
        map.finish()
    }
}

impl<T: ?Sized> Interner<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Interner {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Interns the provided value, returning a handle which can be used to
    /// retrieve it later.
    pub fn intern(&mut self, value: &T) -> Interned<T>
    where
        T: Eq + Hash + ToOwned,
        T::Owned: Into<Rc<T>>,
    {
        if let Some(handle) = self.map.get(value) {
            return Interned::from_handle(*handle);
        }
        let key: Rc<T> = value.to_owned().into();
        let handle = u32::try_from(self.vec.len() + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("interner out of capacity");
        self.vec.push(Rc::clone(&key));
        self.map.insert(key, handle);
        Interned::from_handle(handle)
    }

    /// Returns the corresponding value for the provided [`Interned`] handle.
    /// Panics if the handle came from another interner.
    pub fn get(&self, handle: Interned<T>) -> &T {
        &self.vec[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner() {
        let mut i = Interner::<str>::with_capacity(3);

        let x1 = i.intern("x");
        let fib1 = i.intern("fib");
        let print1 = i.intern("print");

        let x2 = i.intern("x");
        let fib2 = i.intern("fib");
        let print2 = i.intern("print");

        assert_eq!(x1, x2);
        assert_eq!(fib1, fib2);
        assert_eq!(print1, print2);
        assert_ne!(x1, fib1);

        assert_eq!(i.get(fib1), "fib");
        assert_eq!(i.len(), 3);
    }

    #[test]
    fn starts_empty() {
        let mut i = Interner::<str>::with_capacity(1);
        assert!(i.is_empty());
        let main = i.intern("main");
        assert!(!i.is_empty());
        assert_eq!(i.get(main), "main");
    }
}

use std::fmt;

/// A named accessor pair selecting one field of a state type.
///
/// Two fields are the same field when their names match. Build one with
/// [`Field::new`] or the [`field!`](crate::field) macro.
pub struct Field<T, V> {
    name: &'static str,
    get: fn(&T) -> &V,
    set: fn(&mut T, V),
}

impl<T, V> Field<T, V> {
    /// Create a field from its name, a getter and a setter.
    ///
    /// The name is the field's identity: within one state type, every field
    /// with the same name must read and write the same data. A
    /// [`BindingSlot`](crate::BindingSlot) keeps its binding when handed a
    /// freshly built field with an unchanged name.
    pub const fn new(name: &'static str, get: fn(&T) -> &V, set: fn(&mut T, V)) -> Self {
        Self { name, get, set }
    }

    /// The field's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Borrow the field out of a state value.
    pub fn get<'a>(&self, state: &'a T) -> &'a V {
        (self.get)(state)
    }

    /// Overwrite the field in a state value.
    pub fn set(&self, state: &mut T, value: V) {
        (self.set)(state, value)
    }

    /// Whether `other` selects the same field, judged by name alone.
    pub fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Field<T, V> {}

impl<T, V> fmt::Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

/// Build a [`Field`] for a named struct field.
///
/// ```
/// use storehouse::field;
///
/// #[derive(Clone)]
/// struct State {
///     count: u32,
/// }
///
/// let count = field!(State, count);
/// let mut state = State { count: 1 };
/// count.set(&mut state, 2);
/// assert_eq!(*count.get(&state), 2);
/// assert_eq!(count.name(), "count");
/// ```
#[macro_export]
macro_rules! field {
    ($state:ty, $name:ident) => {
        $crate::Field::<$state, _>::new(
            ::core::stringify!($name),
            |state: &$state| &state.$name,
            |state: &mut $state, value| state.$name = value,
        )
    };
}

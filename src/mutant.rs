//! Parameter and header values.

use std::{collections::HashMap, fmt, str::FromStr};

use crate::error::MutantError;

/// All the parameters (or headers) of a request, by name
pub type Params = HashMap<String, Mutant>;

/// A named, possibly multi-valued, raw value coming from the request which
/// can be converted into many target types.
///
/// Values are kept in the order they were collected: for parameters that is
/// path, then query, then body.
///
/// ```rust
/// # use grenat::mutant::Mutant;
/// let page = Mutant::new("page", vec!["2".to_string(), "7".to_string()]);
/// assert_eq!(page.to::<u32>().unwrap(), 2);
/// assert_eq!(page.to_list::<u32>().unwrap(), vec![2, 7]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mutant {
    name: String,
    values: Vec<String>,
}

impl Mutant {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Mutant { name: name.into(), values }
    }

    /// A value with nothing in it
    pub fn empty(name: impl Into<String>) -> Self {
        Mutant::new(name, Vec::new())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when at least one value is present
    #[inline]
    pub fn is_set(&self) -> bool {
        !self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(|s| s.as_str())
    }

    /// First raw value, failing if there is none
    pub fn value(&self) -> Result<&str, MutantError> {
        self.first().ok_or_else(|| self.missing())
    }

    pub fn value_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.first().unwrap_or(default)
    }

    /// Convert the first value
    pub fn to<T>(&self) -> Result<T, MutantError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.convert(self.value()?)
    }

    /// Convert the first value if there is one
    pub fn to_optional<T>(&self) -> Result<Option<T>, MutantError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.first().map(|v| self.convert(v)).transpose()
    }

    /// Convert the first value, falling back to `default` when unset
    pub fn to_or<T>(&self, default: T) -> Result<T, MutantError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.to_optional()?.unwrap_or(default))
    }

    /// Convert every value
    pub fn to_list<T>(&self) -> Result<Vec<T>, MutantError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.values.iter().map(|v| self.convert(v)).collect()
    }

    pub(crate) fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    fn convert<T>(&self, value: &str) -> Result<T, MutantError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value.parse::<T>().map_err(|e| MutantError::Invalid {
            name: self.name.clone(),
            value: value.to_owned(),
            ty: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }

    fn missing(&self) -> MutantError {
        MutantError::Missing { name: self.name.clone() }
    }
}

impl fmt::Display for Mutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value_or(""))
    }
}

impl<'a> IntoIterator for &'a Mutant {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Group `(name, value)` pairs into [`Params`], keeping the order of values
pub(crate) fn collect<'a, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut params = Params::new();
    for (name, value) in pairs {
        params.entry(name.to_owned()).or_insert_with(|| Mutant::empty(name)).push(value);
    }
    params
}

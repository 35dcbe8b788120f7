//! Layered option merging.
//!
//! Options arrive as an ordered stack of partial records: built-in defaults,
//! organization defaults, then whatever the caller supplied. [`Merge`] folds
//! one layer over another with per-field semantics:
//!
//! | Field kind              | Semantics                                  |
//! |-------------------------|--------------------------------------------|
//! | scalar (`String`, enum) | overlay replaces base                      |
//! | `Option<T>`             | absent overlay keeps base, else merge `T`  |
//! | nested options struct   | recurse                                    |
//! | list, "add to defaults" | [`append_unique`]                          |
//! | list, "override"        | [`replace_list`]                           |
//! | string map              | [`merge_maps`], overlay wins per key       |
//!
//! Loosely typed override documents (the `override` argument taken by the
//! workflow builders) go through [`DeepMerge`] instead.

use std::collections::BTreeMap;

/// Fold `overlay` on top of `self`. Both sides are owned, so callers keep
/// their originals untouched by cloning before the merge.
pub trait Merge {
    fn merge(self, overlay: Self) -> Self;
}

/// Implements [`Merge`] as plain replacement for scalar-like types.
macro_rules! merge_by_replacement {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::domain::merge::Merge for $ty {
                fn merge(self, overlay: Self) -> Self {
                    overlay
                }
            }
        )*
    };
}

pub(crate) use merge_by_replacement;

merge_by_replacement!(String, bool, u8, u16, u32, u64, usize, i64);

impl<T: Merge> Merge for Option<T> {
    fn merge(self, overlay: Self) -> Self {
        match (self, overlay) {
            (Some(base), Some(overlay)) => Some(base.merge(overlay)),
            (base, None) => base,
            (None, overlay) => overlay,
        }
    }
}

/// Concatenate two lists, skipping overlay items already present.
pub fn append_unique<T: PartialEq>(base: Option<Vec<T>>, overlay: Option<Vec<T>>) -> Option<Vec<T>> {
    match (base, overlay) {
        (Some(mut base), Some(overlay)) => {
            for item in overlay {
                if !base.contains(&item) {
                    base.push(item);
                }
            }
            Some(base)
        }
        (base, None) => base,
        (None, overlay) => overlay,
    }
}

/// A present overlay list replaces the base list wholesale.
pub fn replace_list<T>(base: Option<Vec<T>>, overlay: Option<Vec<T>>) -> Option<Vec<T>> {
    overlay.or(base)
}

/// Key-wise map merge; values present on both sides are merged recursively.
pub fn merge_maps<V: Merge>(
    base: Option<BTreeMap<String, V>>,
    overlay: Option<BTreeMap<String, V>>,
) -> Option<BTreeMap<String, V>> {
    match (base, overlay) {
        (Some(mut base), Some(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => existing.merge(value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Some(base)
        }
        (base, None) => base,
        (None, overlay) => overlay,
    }
}

/// Fold layers lowest to highest precedence.
pub fn merge_layers<T, I>(layers: I) -> T
where
    T: Merge + Default,
    I: IntoIterator<Item = T>,
{
    layers.into_iter().fold(T::default(), Merge::merge)
}

/// How sequences combine during a [`DeepMerge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStrategy {
    /// Overlay sequence replaces the base sequence.
    Replace,
    /// Overlay items are appended unless already present.
    Concat,
}

/// Recursive merge of untyped documents. Mappings merge key-wise; any other
/// pairing is a replacement, including an explicit `null`.
pub trait DeepMerge {
    fn deep_merge(&mut self, overlay: Self, strategy: ArrayStrategy);
}

impl DeepMerge for serde_yaml::Value {
    fn deep_merge(&mut self, overlay: Self, strategy: ArrayStrategy) {
        use serde_yaml::Value;

        match (self, overlay) {
            (Value::Mapping(base), Value::Mapping(overlay)) => {
                for (key, value) in overlay {
                    match base.get_mut(&key) {
                        Some(existing) => existing.deep_merge(value, strategy),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (Value::Sequence(base), Value::Sequence(overlay))
                if strategy == ArrayStrategy::Concat =>
            {
                for item in overlay {
                    if !base.contains(&item) {
                        base.push(item);
                    }
                }
            }
            (slot, value) => *slot = value,
        }
    }
}

impl DeepMerge for serde_json::Value {
    fn deep_merge(&mut self, overlay: Self, strategy: ArrayStrategy) {
        use serde_json::Value;

        match (self, overlay) {
            (Value::Object(base), Value::Object(overlay)) => {
                for (key, value) in overlay {
                    match base.get_mut(&key) {
                        Some(existing) => existing.deep_merge(value, strategy),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (Value::Array(base), Value::Array(overlay)) if strategy == ArrayStrategy::Concat => {
                for item in overlay {
                    if !base.contains(&item) {
                        base.push(item);
                    }
                }
            }
            (slot, value) => *slot = value,
        }
    }
}

/// Untyped documents nested in typed options (prettier settings, jest
/// config, overrides) merge deeply with sequences replaced.
impl Merge for serde_json::Value {
    fn merge(mut self, overlay: Self) -> Self {
        self.deep_merge(overlay, ArrayStrategy::Replace);
        self
    }
}

impl Merge for serde_yaml::Value {
    fn merge(mut self, overlay: Self) -> Self {
        self.deep_merge(overlay, ArrayStrategy::Replace);
        self
    }
}

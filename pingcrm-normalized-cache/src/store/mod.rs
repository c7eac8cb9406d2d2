mod data;
#[allow(clippy::module_inception)]
mod store;

#[cfg(test)]
mod tests;

pub use store::Store;

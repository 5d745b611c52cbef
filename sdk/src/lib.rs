pub mod context;
pub mod credentials;
pub mod crypto;
pub mod gate;
pub mod protection;
pub mod resolver;
pub mod store;
pub mod token;

#[cfg(test)]
mod fixtures;

// persistent ids for prefixes and namespaces
mod namespace;
mod prefix;

pub use namespace::NamespaceId;
pub(crate) use namespace::NamespaceLookup;
pub use prefix::PrefixId;
pub(crate) use prefix::PrefixLookup;

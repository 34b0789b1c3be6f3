//! In-memory storage backend.
//!
//! Backs the test suite and host builds with the same open/read/write/commit
//! discipline a flash backend has, minus the durability.

use heapless::{LinearMap, String, Vec};

use super::{Namespace, NamespaceHandle, Storage, MAX_KEY_LEN};

const MAX_ENTRIES: usize = 64;
const MAX_BLOB: usize = 512;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Blob(Vec<u8, MAX_BLOB>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Full,
    KeyTooLong,
    TypeMismatch,
    BlobTooLarge,
}

type Key = (u8, String<MAX_KEY_LEN>);

/// A volatile [`Storage`] implementation.
#[derive(Default)]
pub struct MemStorage {
    entries: LinearMap<Key, Value, MAX_ENTRIES>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Storage for MemStorage {
    type Error = Error;
    type Handle<'a> = MemHandle<'a> where Self: 'a;

    fn open(&mut self, ns: Namespace) -> Result<Self::Handle<'_>, Self::Error> {
        Ok(MemHandle {
            ns,
            entries: &mut self.entries,
        })
    }
}

/// Scoped view of one namespace.
pub struct MemHandle<'a> {
    ns: Namespace,
    entries: &'a mut LinearMap<Key, Value, MAX_ENTRIES>,
}

impl MemHandle<'_> {
    fn key(&self, key: &str) -> Result<Key, Error> {
        let name = String::try_from(key).map_err(|_| Error::KeyTooLong)?;
        Ok((self.ns as u8, name))
    }

    fn get(&self, key: &str) -> Result<Option<&Value>, Error> {
        Ok(self.entries.get(&self.key(key)?))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), Error> {
        let key = self.key(key)?;
        // insert replaces in place; the Err branch means the map is full
        self.entries.insert(key, value).map_err(|_| Error::Full)?;
        Ok(())
    }
}

impl NamespaceHandle for MemHandle<'_> {
    type Error = Error;

    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, Error> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::U32(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::TypeMismatch),
        }
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), Error> {
        self.set(key, Value::U32(value))
    }

    fn get_u64(&mut self, key: &str) -> Result<Option<u64>, Error> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::U64(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::TypeMismatch),
        }
    }

    fn set_u64(&mut self, key: &str, value: u64) -> Result<(), Error> {
        self.set(key, Value::U64(value))
    }

    fn get_f32(&mut self, key: &str) -> Result<Option<f32>, Error> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::F32(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::TypeMismatch),
        }
    }

    fn set_f32(&mut self, key: &str, value: f32) -> Result<(), Error> {
        self.set(key, Value::F32(value))
    }

    fn get_f64(&mut self, key: &str) -> Result<Option<f64>, Error> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::F64(v)) => Ok(Some(*v)),
            Some(_) => Err(Error::TypeMismatch),
        }
    }

    fn set_f64(&mut self, key: &str, value: f64) -> Result<(), Error> {
        self.set(key, Value::F64(value))
    }

    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Blob(blob)) => {
                let len = blob.len().min(buf.len());
                buf[..len].copy_from_slice(&blob[..len]);
                Ok(Some(len))
            }
            Some(_) => Err(Error::TypeMismatch),
        }
    }

    fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), Error> {
        let blob = Vec::from_slice(value).map_err(|_| Error::BlobTooLarge)?;
        self.set(key, Value::Blob(blob))
    }

    fn commit(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        let mut storage = MemStorage::new();
        {
            let mut h = storage.open(Namespace::System).unwrap();
            h.set_u32("boot_cnt", 7).unwrap();
            h.set_f64("pend_dist", 0.25).unwrap();
            h.commit().unwrap();
        }
        let mut h = storage.open(Namespace::System).unwrap();
        assert_eq!(h.get_u32("boot_cnt").unwrap(), Some(7));
        assert_eq!(h.get_f64("pend_dist").unwrap(), Some(0.25));
        assert_eq!(h.get_u32("missing").unwrap(), None);
    }

    #[test]
    fn namespaces_are_disjoint() {
        let mut storage = MemStorage::new();
        storage
            .open(Namespace::TripA)
            .unwrap()
            .set_f64("dist", 1.0)
            .unwrap();
        assert_eq!(
            storage
                .open(Namespace::TripB)
                .unwrap()
                .get_f64("dist")
                .unwrap(),
            None
        );
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut storage = MemStorage::new();
        let mut h = storage.open(Namespace::Settings).unwrap();
        h.set_u32("bright", 75).unwrap();
        assert_eq!(h.get_f32("bright"), Err(Error::TypeMismatch));
    }

    #[test]
    fn blob_round_trip() {
        let mut storage = MemStorage::new();
        let mut h = storage.open(Namespace::DtcHistory).unwrap();
        h.set_blob("log", &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(h.get_blob("log", &mut buf).unwrap(), Some(4));
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn overlong_key_is_rejected() {
        let mut storage = MemStorage::new();
        let mut h = storage.open(Namespace::Settings).unwrap();
        assert_eq!(
            h.set_u32("a_key_longer_than_fifteen", 0),
            Err(Error::KeyTooLong)
        );
    }
}

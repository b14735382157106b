//! Set operator
//!
//! Member entries carry empty values; membership is key presence. The size
//! entry tracks cardinality and is deleted (with the set's expiration) when
//! it reaches zero.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, check_member_size, WriteTx};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::Db;
use engine::BoundsKind;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
enum SetOp {
    Union,
    Diff,
    Inter,
}

impl Db {
    pub fn sadd(&self, key: &[u8], members: &[&[u8]]) -> Result<i64> {
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        let mut added: HashSet<&[u8]> = HashSet::new();
        for member in members {
            check_member_size(key, member)?;
            let ek = codec::encode_set_key(self.index(), key, member);
            if !added.contains(member) && self.engine().get(&ek)?.is_none() {
                num += 1;
                added.insert(*member);
            }
            t.put(ek, Vec::new());
        }
        if num > 0 {
            self.s_incr_size(&mut t, key, num)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn srem(&self, key: &[u8], members: &[&[u8]]) -> Result<i64> {
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        let mut removed: HashSet<&[u8]> = HashSet::new();
        for member in members {
            check_member_size(key, member)?;
            if removed.contains(member) {
                continue;
            }
            let ek = codec::encode_set_key(self.index(), key, member);
            if self.engine().get(&ek)?.is_some() {
                num += 1;
                t.delete(ek);
                removed.insert(*member);
            }
        }
        if num > 0 {
            self.s_incr_size(&mut t, key, -num)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn scard(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        self.read_i64(&codec::encode_set_size_key(self.index(), key))
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> Result<i64> {
        check_member_size(key, member)?;
        let ek = codec::encode_set_key(self.index(), key, member);
        Ok(if self.engine().get(&ek)?.is_some() { 1 } else { 0 })
    }

    pub fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        check_key_size(key)?;
        let mut out = Vec::new();
        let mut it = self.range_iter(
            Some(codec::set_start_key(self.index(), key)),
            Some(codec::set_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            let (_, member) = codec::decode_set_key(self.index(), it.key())?;
            out.push(member);
            it.next();
        }
        Ok(out)
    }

    /// Members of the first set minus members of the rest. Result order is
    /// unspecified; an empty first set yields an empty result.
    pub fn sdiff(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        self.s_diff_generic(keys)
    }

    pub fn sinter(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        self.s_inter_generic(keys)
    }

    pub fn sunion(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        self.s_union_generic(keys)
    }

    pub fn sdiff_store(&self, dst: &[u8], keys: &[&[u8]]) -> Result<i64> {
        self.s_store_generic(dst, SetOp::Diff, keys)
    }

    pub fn sinter_store(&self, dst: &[u8], keys: &[&[u8]]) -> Result<i64> {
        self.s_store_generic(dst, SetOp::Inter, keys)
    }

    pub fn sunion_store(&self, dst: &[u8], keys: &[&[u8]]) -> Result<i64> {
        self.s_store_generic(dst, SetOp::Union, keys)
    }

    pub fn sclear(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        let num = self.s_delete(&mut t, key)?;
        self.rm_expire_tx(&mut t, DataType::Set, key)?;
        t.commit()?;
        Ok(num)
    }

    pub fn smclear(&self, keys: &[&[u8]]) -> Result<i64> {
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        for key in keys {
            check_key_size(key)?;
            self.s_delete(&mut t, key)?;
            self.rm_expire_tx(&mut t, DataType::Set, key)?;
        }
        t.commit()?;
        Ok(keys.len() as i64)
    }

    pub fn sexpire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.s_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn sexpire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.s_expire_at(key, when)
    }

    fn s_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.set_lock.lock();
        if self.scard(key)? == 0 {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::Set, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn sttl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self.scard(key)? > 0;
        self.collection_ttl(DataType::Set, key, exists)
    }

    pub fn spersist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::Set, key)?;
        t.commit()?;
        Ok(n)
    }

    fn s_diff_generic(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(Vec::new());
        };
        let mut dest: HashSet<Vec<u8>> = self.smembers(first)?.into_iter().collect();
        for key in rest {
            if dest.is_empty() {
                return Ok(Vec::new());
            }
            for member in self.smembers(key)? {
                dest.remove(&member);
            }
        }
        Ok(dest.into_iter().collect())
    }

    fn s_inter_generic(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(Vec::new());
        };
        let mut dest: HashSet<Vec<u8>> = self.smembers(first)?.into_iter().collect();
        for key in rest {
            check_key_size(key)?;
            let members = self.smembers(key)?;
            // intersecting with an empty set short-circuits to empty
            if members.is_empty() {
                return Ok(Vec::new());
            }
            let members: HashSet<Vec<u8>> = members.into_iter().collect();
            dest.retain(|m| members.contains(m));
            if dest.is_empty() {
                return Ok(Vec::new());
            }
        }
        Ok(dest.into_iter().collect())
    }

    fn s_union_generic(&self, keys: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
        let mut dest: HashSet<Vec<u8>> = HashSet::new();
        for key in keys {
            check_key_size(key)?;
            for member in self.smembers(key)? {
                dest.insert(member);
            }
        }
        Ok(dest.into_iter().collect())
    }

    /// Compute the set operation, then in one transaction clear `dst`, write
    /// the result members, and set `dst`'s size to the result cardinality.
    fn s_store_generic(&self, dst: &[u8], op: SetOp, keys: &[&[u8]]) -> Result<i64> {
        check_key_size(dst)?;
        let _guard = self.set_lock.lock();
        let mut t = self.tx();
        self.s_delete(&mut t, dst)?;

        let members = match op {
            SetOp::Union => self.s_union_generic(keys)?,
            SetOp::Diff => self.s_diff_generic(keys)?,
            SetOp::Inter => self.s_inter_generic(keys)?,
        };

        for member in &members {
            check_member_size(dst, member)?;
            t.put(codec::encode_set_key(self.index(), dst, member), Vec::new());
        }

        let num = members.len() as i64;
        if num > 0 {
            t.put(
                codec::encode_set_size_key(self.index(), dst),
                codec::encode_i64(num).to_vec(),
            );
        }
        t.commit()?;
        Ok(num)
    }

    /// Adjust the size entry by `delta`; at zero the entry is deleted and the
    /// set's expiration is purged.
    fn s_incr_size(&self, t: &mut WriteTx<'_>, key: &[u8], delta: i64) -> Result<i64> {
        let sk = codec::encode_set_size_key(self.index(), key);
        let mut size = self.read_i64(&sk)?;
        size += delta;
        if size <= 0 {
            size = 0;
            t.delete(sk);
            self.rm_expire_tx(t, DataType::Set, key)?;
        } else {
            t.put(sk, codec::encode_i64(size).to_vec());
        }
        Ok(size)
    }

    /// Buffer deletion of every member entry plus the size entry.
    pub(crate) fn s_delete(&self, t: &mut WriteTx<'_>, key: &[u8]) -> Result<i64> {
        let mut num = 0;
        let mut it = self.range_iter(
            Some(codec::set_start_key(self.index(), key)),
            Some(codec::set_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            num += 1;
            it.next();
        }
        t.delete(codec::encode_set_size_key(self.index(), key));
        Ok(num)
    }
}

//! Sorted-set operator
//!
//! Two indexes per zset, kept in one-to-one correspondence inside every
//! commit: the member index (member -> score) for point lookups and the
//! score index ((score, member) -> ()) whose raw byte order equals
//! (score, member) order, so rank and score ranges are single scans.
//!
//! Scores are i64 only. `MIN_SCORE`/`MAX_SCORE` are reserved sentinels
//! standing for -inf/+inf in range queries; stored scores lie strictly
//! between them.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, check_member_size, WriteTx};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::{Db, MAX_SCORE, MIN_SCORE};
use engine::BoundsKind;
use std::collections::HashMap;

/// One (score, member) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePair {
    pub score: i64,
    pub member: Vec<u8>,
}

/// How `zunion_store`/`zinter_store` combine scores across sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

fn check_score(score: i64) -> Result<()> {
    if score <= MIN_SCORE || score >= MAX_SCORE {
        return Err(StoreError::ScoreOverflow);
    }
    Ok(())
}

impl Db {
    /// Returns the number of members newly created.
    pub fn zadd(&self, key: &[u8], pairs: &[ScorePair]) -> Result<i64> {
        check_key_size(key)?;
        if pairs.is_empty() {
            return Ok(0);
        }
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let mut pending: HashMap<Vec<u8>, i64> = HashMap::new();
        let mut num = 0;
        for pair in pairs {
            check_member_size(key, &pair.member)?;
            check_score(pair.score)?;
            let old = match pending.get(&pair.member) {
                Some(s) => Some(*s),
                None => {
                    let mk = codec::encode_zset_key(self.index(), key, &pair.member);
                    match self.engine().get(&mk)? {
                        Some(v) => Some(codec::decode_i64(&v)?),
                        None => None,
                    }
                }
            };
            match old {
                Some(old_score) => {
                    if old_score != pair.score {
                        t.delete(codec::encode_zscore_key(
                            self.index(),
                            key,
                            old_score,
                            &pair.member,
                        ));
                    }
                }
                None => num += 1,
            }
            t.put(
                codec::encode_zset_key(self.index(), key, &pair.member),
                codec::encode_i64(pair.score).to_vec(),
            );
            t.put(
                codec::encode_zscore_key(self.index(), key, pair.score, &pair.member),
                Vec::new(),
            );
            pending.insert(pair.member.clone(), pair.score);
        }
        if num > 0 {
            self.z_incr_size(&mut t, key, num)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn zcard(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        self.read_i64(&codec::encode_zset_size_key(self.index(), key))
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<i64> {
        check_member_size(key, member)?;
        match self
            .engine()
            .get(&codec::encode_zset_key(self.index(), key, member))?
        {
            Some(v) => codec::decode_i64(&v),
            None => Err(StoreError::ScoreMiss),
        }
    }

    pub fn zincr_by(&self, key: &[u8], delta: i64, member: &[u8]) -> Result<i64> {
        check_member_size(key, member)?;
        let mk = codec::encode_zset_key(self.index(), key, member);
        let _guard = self.zset_lock.lock();
        let old = match self.engine().get(&mk)? {
            Some(v) => Some(codec::decode_i64(&v)?),
            None => None,
        };
        let base = old.unwrap_or(0);
        let score = base.checked_add(delta).ok_or(StoreError::ScoreOverflow)?;
        check_score(score)?;

        let mut t = self.tx();
        if let Some(old_score) = old {
            if old_score != score {
                t.delete(codec::encode_zscore_key(self.index(), key, old_score, member));
            }
        }
        t.put(mk, codec::encode_i64(score).to_vec());
        t.put(
            codec::encode_zscore_key(self.index(), key, score, member),
            Vec::new(),
        );
        if old.is_none() {
            self.z_incr_size(&mut t, key, 1)?;
        }
        t.commit()?;
        Ok(score)
    }

    pub fn zrem(&self, key: &[u8], members: &[&[u8]]) -> Result<i64> {
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        let mut removed: Vec<&[u8]> = Vec::with_capacity(members.len());
        for member in members {
            check_member_size(key, member)?;
            if removed.contains(member) {
                continue;
            }
            let mk = codec::encode_zset_key(self.index(), key, member);
            if let Some(v) = self.engine().get(&mk)? {
                let score = codec::decode_i64(&v)?;
                t.delete(mk);
                t.delete(codec::encode_zscore_key(self.index(), key, score, member));
                num += 1;
                removed.push(member);
            }
        }
        if num > 0 {
            self.z_incr_size(&mut t, key, -num)?;
        }
        t.commit()?;
        Ok(num)
    }

    /// 0-based rank in ascending (score, member) order; -1 if absent.
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<i64> {
        self.z_rank(key, member, false)
    }

    pub fn zrevrank(&self, key: &[u8], member: &[u8]) -> Result<i64> {
        self.z_rank(key, member, true)
    }

    fn z_rank(&self, key: &[u8], member: &[u8], reverse: bool) -> Result<i64> {
        check_member_size(key, member)?;
        if self
            .engine()
            .get(&codec::encode_zset_key(self.index(), key, member))?
            .is_none()
        {
            return Ok(-1);
        }
        let start = Some(codec::zset_score_start(self.index(), key));
        let stop = Some(codec::zset_score_stop(self.index(), key));
        let mut it = if reverse {
            self.rev_range_iter(start, stop, BoundsKind::ClosedOpen, 0, -1)?
        } else {
            self.range_iter(start, stop, BoundsKind::ClosedOpen, 0, -1)?
        };
        let mut n = 0;
        while it.valid() {
            let (_, _, m) = codec::decode_zscore_key(self.index(), it.key())?;
            if m == member {
                return Ok(n);
            }
            n += 1;
            it.next();
        }
        Ok(-1)
    }

    /// Rank range scan; negative indices count from the tail.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64, reverse: bool) -> Result<Vec<ScorePair>> {
        check_key_size(key)?;
        let len = self.zcard(key)?;
        let Some((offset, count)) = normalize_rank_range(len, start, stop) else {
            return Ok(Vec::new());
        };
        self.z_scan_score_index(key, None, None, offset, count, reverse)
    }

    /// Score range scan over `[min, max]` inclusive; `count = -1` means
    /// unlimited, a negative `offset` yields an empty result.
    pub fn zrange_by_score(
        &self,
        key: &[u8],
        min: i64,
        max: i64,
        offset: i64,
        count: i64,
        reverse: bool,
    ) -> Result<Vec<ScorePair>> {
        check_key_size(key)?;
        if offset < 0 || min > max {
            return Ok(Vec::new());
        }
        self.z_scan_score_index(key, Some(min), Some(max), offset as usize, count, reverse)
    }

    pub fn zcount(&self, key: &[u8], min: i64, max: i64) -> Result<i64> {
        check_key_size(key)?;
        if min > max {
            return Ok(0);
        }
        let mut it = self.range_iter(
            Some(codec::zscore_start_key(self.index(), key, min)),
            Some(codec::zscore_stop_key(self.index(), key, max)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        let mut n = 0;
        while it.valid() {
            n += 1;
            it.next();
        }
        Ok(n)
    }

    pub fn zrem_range_by_score(&self, key: &[u8], min: i64, max: i64) -> Result<i64> {
        check_key_size(key)?;
        if min > max {
            return Ok(0);
        }
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let num = self.z_delete_range(&mut t, key, Some(min), Some(max), 0, -1)?;
        if num > 0 {
            self.z_incr_size(&mut t, key, -num)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn zrem_range_by_rank(&self, key: &[u8], start: i64, stop: i64) -> Result<i64> {
        check_key_size(key)?;
        let len = self.zcard(key)?;
        let Some((offset, count)) = normalize_rank_range(len, start, stop) else {
            return Ok(0);
        };
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let num = self.z_delete_range(&mut t, key, None, None, offset, count)?;
        if num > 0 {
            self.z_incr_size(&mut t, key, -num)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn zunion_store(
        &self,
        dst: &[u8],
        srcs: &[&[u8]],
        weights: Option<&[i64]>,
        aggregate: Aggregate,
    ) -> Result<i64> {
        check_key_size(dst)?;
        check_weights(srcs, weights)?;
        let _guard = self.zset_lock.lock();

        let mut map: HashMap<Vec<u8>, i64> = HashMap::new();
        for (i, src) in srcs.iter().enumerate() {
            check_key_size(src)?;
            let weight = weight_of(weights, i);
            for (member, score) in self.z_members_scores(src)? {
                let ws = score.checked_mul(weight).ok_or(StoreError::ScoreOverflow)?;
                match map.get_mut(&member) {
                    Some(cur) => *cur = combine(aggregate, *cur, ws)?,
                    None => {
                        map.insert(member, ws);
                    }
                }
            }
        }
        self.z_store_result(dst, map)
    }

    pub fn zinter_store(
        &self,
        dst: &[u8],
        srcs: &[&[u8]],
        weights: Option<&[i64]>,
        aggregate: Aggregate,
    ) -> Result<i64> {
        check_key_size(dst)?;
        check_weights(srcs, weights)?;
        let Some((first, rest)) = srcs.split_first() else {
            return Err(StoreError::Value);
        };
        let _guard = self.zset_lock.lock();

        check_key_size(first)?;
        let w0 = weight_of(weights, 0);
        let mut map: HashMap<Vec<u8>, i64> = HashMap::new();
        for (member, score) in self.z_members_scores(first)? {
            let ws = score.checked_mul(w0).ok_or(StoreError::ScoreOverflow)?;
            map.insert(member, ws);
        }

        for (i, src) in rest.iter().enumerate() {
            check_key_size(src)?;
            let weight = weight_of(weights, i + 1);
            let mut next: HashMap<Vec<u8>, i64> = HashMap::new();
            for (member, score) in self.z_members_scores(src)? {
                if let Some(cur) = map.get(&member) {
                    let ws = score.checked_mul(weight).ok_or(StoreError::ScoreOverflow)?;
                    next.insert(member, combine(aggregate, *cur, ws)?);
                }
            }
            map = next;
            if map.is_empty() {
                break;
            }
        }
        self.z_store_result(dst, map)
    }

    pub fn zclear(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let num = self.z_delete(&mut t, key)?;
        self.rm_expire_tx(&mut t, DataType::ZSet, key)?;
        t.commit()?;
        Ok(num)
    }

    pub fn zmclear(&self, keys: &[&[u8]]) -> Result<i64> {
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        for key in keys {
            check_key_size(key)?;
            self.z_delete(&mut t, key)?;
            self.rm_expire_tx(&mut t, DataType::ZSet, key)?;
        }
        t.commit()?;
        Ok(keys.len() as i64)
    }

    pub fn zexpire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.z_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn zexpire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.z_expire_at(key, when)
    }

    fn z_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.zset_lock.lock();
        if self.zcard(key)? == 0 {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::ZSet, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn zttl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self.zcard(key)? > 0;
        self.collection_ttl(DataType::ZSet, key, exists)
    }

    pub fn zpersist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.zset_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::ZSet, key)?;
        t.commit()?;
        Ok(n)
    }

    /// Walk the score index; score bounds of `None` mean the whole zset.
    fn z_scan_score_index(
        &self,
        key: &[u8],
        min: Option<i64>,
        max: Option<i64>,
        offset: usize,
        count: i64,
        reverse: bool,
    ) -> Result<Vec<ScorePair>> {
        let start = Some(match min {
            Some(s) => codec::zscore_start_key(self.index(), key, s),
            None => codec::zset_score_start(self.index(), key),
        });
        let stop = Some(match max {
            Some(s) => codec::zscore_stop_key(self.index(), key, s),
            None => codec::zset_score_stop(self.index(), key),
        });
        let mut it = if reverse {
            self.rev_range_iter(start, stop, BoundsKind::ClosedOpen, offset, count)?
        } else {
            self.range_iter(start, stop, BoundsKind::ClosedOpen, offset, count)?
        };
        let mut out = Vec::new();
        while it.valid() {
            let (_, score, member) = codec::decode_zscore_key(self.index(), it.key())?;
            out.push(ScorePair { score, member });
            it.next();
        }
        Ok(out)
    }

    /// Delete entries of the score index (and their member-index twins)
    /// selected by score bounds plus offset/limit. Forward order only.
    fn z_delete_range(
        &self,
        t: &mut WriteTx<'_>,
        key: &[u8],
        min: Option<i64>,
        max: Option<i64>,
        offset: usize,
        count: i64,
    ) -> Result<i64> {
        let start = Some(match min {
            Some(s) => codec::zscore_start_key(self.index(), key, s),
            None => codec::zset_score_start(self.index(), key),
        });
        let stop = Some(match max {
            Some(s) => codec::zscore_stop_key(self.index(), key, s),
            None => codec::zset_score_stop(self.index(), key),
        });
        let mut it = self.range_iter(start, stop, BoundsKind::ClosedOpen, offset, count)?;
        let mut num = 0;
        while it.valid() {
            let (_, _, member) = codec::decode_zscore_key(self.index(), it.key())?;
            t.delete(codec::encode_zset_key(self.index(), key, &member));
            t.delete(it.key().to_vec());
            num += 1;
            it.next();
        }
        Ok(num)
    }

    /// Every (member, score) of the member index, in member order.
    fn z_members_scores(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, i64)>> {
        let mut out = Vec::new();
        let mut it = self.range_iter(
            Some(codec::zset_start_key(self.index(), key)),
            Some(codec::zset_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            let (_, member) = codec::decode_zset_key(self.index(), it.key())?;
            let score = codec::decode_i64(it.value())?;
            out.push((member, score));
            it.next();
        }
        Ok(out)
    }

    /// Clear `dst` and write the aggregated result in one commit.
    fn z_store_result(&self, dst: &[u8], map: HashMap<Vec<u8>, i64>) -> Result<i64> {
        let mut t = self.tx();
        self.z_delete(&mut t, dst)?;
        let mut num = 0;
        for (member, score) in &map {
            check_member_size(dst, member)?;
            check_score(*score)?;
            t.put(
                codec::encode_zset_key(self.index(), dst, member),
                codec::encode_i64(*score).to_vec(),
            );
            t.put(
                codec::encode_zscore_key(self.index(), dst, *score, member),
                Vec::new(),
            );
            num += 1;
        }
        if num > 0 {
            t.put(
                codec::encode_zset_size_key(self.index(), dst),
                codec::encode_i64(num).to_vec(),
            );
        }
        t.commit()?;
        Ok(num)
    }

    fn z_incr_size(&self, t: &mut WriteTx<'_>, key: &[u8], delta: i64) -> Result<i64> {
        let sk = codec::encode_zset_size_key(self.index(), key);
        let mut size = self.read_i64(&sk)?;
        size += delta;
        if size <= 0 {
            size = 0;
            t.delete(sk);
            self.rm_expire_tx(t, DataType::ZSet, key)?;
        } else {
            t.put(sk, codec::encode_i64(size).to_vec());
        }
        Ok(size)
    }

    /// Buffer deletion of both indexes plus the size entry.
    pub(crate) fn z_delete(&self, t: &mut WriteTx<'_>, key: &[u8]) -> Result<i64> {
        let mut num = 0;
        let mut it = self.range_iter(
            Some(codec::zset_start_key(self.index(), key)),
            Some(codec::zset_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            num += 1;
            it.next();
        }
        let mut it = self.range_iter(
            Some(codec::zset_score_start(self.index(), key)),
            Some(codec::zset_score_stop(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            it.next();
        }
        t.delete(codec::encode_zset_size_key(self.index(), key));
        Ok(num)
    }
}

fn weight_of(weights: Option<&[i64]>, i: usize) -> i64 {
    weights.map(|w| w[i]).unwrap_or(1)
}

fn check_weights(srcs: &[&[u8]], weights: Option<&[i64]>) -> Result<()> {
    if let Some(w) = weights {
        if w.len() != srcs.len() {
            return Err(StoreError::Value);
        }
    }
    Ok(())
}

fn combine(aggregate: Aggregate, cur: i64, next: i64) -> Result<i64> {
    Ok(match aggregate {
        Aggregate::Sum => cur.checked_add(next).ok_or(StoreError::ScoreOverflow)?,
        Aggregate::Min => cur.min(next),
        Aggregate::Max => cur.max(next),
    })
}

/// Map a (start, stop) rank pair onto (offset, limit); `None` means empty.
fn normalize_rank_range(len: i64, start: i64, stop: i64) -> Option<(usize, i64)> {
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if start > stop || start >= len {
        return None;
    }
    if stop >= len {
        stop = len - 1;
    }
    Some((start as usize, stop - start + 1))
}

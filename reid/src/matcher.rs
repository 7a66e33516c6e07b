//! Sighting match lifecycle.
//!
//! Drives the `pending -> processing -> {matched, no_match}` state machine
//! and human feedback. The embed+match operation persists in two steps
//! (match result, then sighting status); both are idempotent overwrites
//! keyed by the sighting id, so re-running after a crash between the steps
//! converges rather than duplicating anything.

use std::sync::Arc;

use chrono::Utc;
use strayid_embed::EmbedError;
use strayid_kv::KVStore;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::codec::{decode, encode};
use crate::config::Config;
use crate::error::ReidError;
use crate::keys;
use crate::rank::{rank, round4};
use crate::types::{
    MatchCandidate, MatchResult, MatchStatus, NewSighting, Sighting, SightingStatus,
};

pub struct Matcher {
    store: Arc<dyn KVStore>,
    cfg: Config,
}

impl Matcher {
    pub fn new(store: Arc<dyn KVStore>, cfg: Config) -> Self {
        Self {
            store,
            cfg: cfg.with_defaults(),
        }
    }

    /// Persist a new sighting in `Pending` with no embedding.
    pub fn create(&self, new: NewSighting, photo_paths: Vec<String>) -> Result<Sighting, ReidError> {
        self.create_with_id(Uuid::new_v4().simple().to_string(), new, photo_paths)
    }

    /// Like [`create`](Self::create) but with a caller-supplied id, so the
    /// photo storage prefix and the record id can agree.
    pub(crate) fn create_with_id(
        &self,
        id: String,
        new: NewSighting,
        photo_paths: Vec<String>,
    ) -> Result<Sighting, ReidError> {
        let now = Utc::now();
        let sighting = Sighting {
            id,
            photo_paths,
            location: new.location,
            notes: new.notes,
            tags: new.tags,
            embedding: None,
            model_version: None,
            status: SightingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let doc = encode(&sighting)?;
        let doc_k = keys::sighting_key(&sighting.id);
        let idx_k = keys::sighting_ts_key(sighting.created_at.timestamp_micros(), &sighting.id);
        self.store.batch_set(&[
            (doc_k.as_str(), doc.as_slice()),
            (idx_k.as_str(), sighting.id.as_bytes()),
        ])?;
        Ok(sighting)
    }

    /// Fetch a sighting. Errors with NotFound when absent.
    pub fn get(&self, sighting_id: &str) -> Result<Sighting, ReidError> {
        self.try_get(sighting_id)?
            .ok_or_else(|| ReidError::NotFound(format!("sighting {sighting_id}")))
    }

    /// Fetch a sighting, `None` when absent.
    pub fn try_get(&self, sighting_id: &str) -> Result<Option<Sighting>, ReidError> {
        match self.store.get(&keys::sighting_key(sighting_id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Run the embed+match transition for a sighting given its per-photo
    /// embedding attempts.
    ///
    /// When aggregation yields a vector, the sighting moves to
    /// `Processing`, is ranked against every other embedded sighting (a
    /// record never matches itself), and lands in `Matched` (with a
    /// persisted result) or `NoMatch` (with none). When aggregation yields
    /// nothing, the sighting is left untouched for a later retry.
    pub fn embed_and_match(
        &self,
        sighting_id: &str,
        attempts: &[Result<Vec<f32>, EmbedError>],
        model_version: Option<&str>,
    ) -> Result<Sighting, ReidError> {
        let mut sighting = self.get(sighting_id)?;

        let Some(query) = aggregate(attempts) else {
            tracing::debug!(
                sighting_id,
                attempts = attempts.len(),
                "no embedding obtained, leaving state unchanged"
            );
            return Ok(sighting);
        };

        sighting.status = SightingStatus::Processing;
        sighting.embedding = Some(query.clone());
        sighting.model_version = model_version.map(str::to_string);
        sighting.updated_at = Utc::now();
        self.put_embedded(&sighting)?;

        let candidates = self.load_candidates(sighting_id)?;
        let scored = rank(
            &query,
            candidates,
            self.cfg.similarity_threshold,
            self.cfg.max_match_results,
        );

        if scored.is_empty() {
            // Zero qualifiers: the absence of a match result is the
            // signal. A result left over from an earlier run is dropped
            // unless a human has already ruled on it.
            if let Some(existing) = self.try_get_result(sighting_id)? {
                if existing.status == MatchStatus::Pending {
                    self.store.delete(&keys::match_key(sighting_id))?;
                }
            }
            sighting.status = SightingStatus::NoMatch;
            sighting.updated_at = Utc::now();
            self.put(&sighting)?;
            return Ok(sighting);
        }

        let candidates: Vec<MatchCandidate> = scored
            .into_iter()
            .map(|s| MatchCandidate {
                sighting_id: s.id,
                score: round4(s.score),
            })
            .collect();
        tracing::info!(
            sighting_id,
            candidates = candidates.len(),
            top_score = candidates[0].score,
            "match candidates found"
        );

        // Overwrite keyed by sighting id. A pre-existing result keeps its
        // creation time and any feedback already recorded on it.
        let now = Utc::now();
        let result = match self.try_get_result(sighting_id)? {
            Some(existing) => MatchResult {
                candidates,
                updated_at: now,
                ..existing
            },
            None => MatchResult {
                sighting_id: sighting_id.to_string(),
                candidates,
                status: MatchStatus::Pending,
                confirmed_profile_id: None,
                created_at: now,
                updated_at: now,
            },
        };
        let doc = encode(&result)?;
        self.store.set(&keys::match_key(sighting_id), &doc)?;

        sighting.status = SightingStatus::Matched;
        sighting.updated_at = Utc::now();
        self.put(&sighting)?;
        Ok(sighting)
    }

    /// Fetch the match result for a sighting. NotFound when the sighting
    /// is absent or matching never produced a result for it.
    pub fn get_matches(&self, sighting_id: &str) -> Result<MatchResult, ReidError> {
        self.get(sighting_id)?;
        self.try_get_result(sighting_id)?
            .ok_or_else(|| ReidError::NotFound(format!("match result for sighting {sighting_id}")))
    }

    /// Record human feedback on a match result and derive the sighting
    /// status from it: confirmed -> Matched, rejected -> NoMatch. The
    /// derivation overrides whatever state the sighting was in.
    pub fn submit_feedback(
        &self,
        sighting_id: &str,
        status: MatchStatus,
        confirmed_profile_id: Option<String>,
    ) -> Result<MatchResult, ReidError> {
        let derived = match status {
            MatchStatus::Confirmed => SightingStatus::Matched,
            MatchStatus::Rejected => SightingStatus::NoMatch,
            MatchStatus::Pending => {
                return Err(ReidError::Validation(
                    "feedback status must be confirmed or rejected".to_string(),
                ));
            }
        };

        let mut sighting = self.get(sighting_id)?;
        let mut result = self.try_get_result(sighting_id)?.ok_or_else(|| {
            ReidError::NotFound(format!("match result for sighting {sighting_id}"))
        })?;

        let now = Utc::now();
        result.status = status;
        if let Some(profile_id) = confirmed_profile_id {
            result.confirmed_profile_id = Some(profile_id);
        }
        result.updated_at = now;
        let doc = encode(&result)?;
        self.store.set(&keys::match_key(sighting_id), &doc)?;

        sighting.status = derived;
        sighting.updated_at = now;
        self.put(&sighting)?;
        Ok(result)
    }

    fn try_get_result(&self, sighting_id: &str) -> Result<Option<MatchResult>, ReidError> {
        match self.store.get(&keys::match_key(sighting_id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Load every other embedded sighting as (id, vector) pairs, walking
    /// the marker index. Self-exclusion happens here, before scoring.
    fn load_candidates(&self, exclude_id: &str) -> Result<Vec<(String, Vec<f32>)>, ReidError> {
        let mut out = Vec::new();
        for (_key, value) in self.store.scan(keys::sighting_emb_prefix())? {
            let id = String::from_utf8_lossy(&value).into_owned();
            if id == exclude_id {
                continue;
            }
            if let Some(other) = self.try_get(&id)? {
                if let Some(vec) = other.embedding {
                    out.push((id, vec));
                }
            }
        }
        Ok(out)
    }

    fn put(&self, sighting: &Sighting) -> Result<(), ReidError> {
        let doc = encode(sighting)?;
        self.store.set(&keys::sighting_key(&sighting.id), &doc)?;
        Ok(())
    }

    fn put_embedded(&self, sighting: &Sighting) -> Result<(), ReidError> {
        let doc = encode(sighting)?;
        let doc_k = keys::sighting_key(&sighting.id);
        let marker_k = keys::sighting_emb_key(&sighting.id);
        self.store.batch_set(&[
            (doc_k.as_str(), doc.as_slice()),
            (marker_k.as_str(), sighting.id.as_bytes()),
        ])?;
        Ok(())
    }
}

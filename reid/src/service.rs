//! Pipeline facade.
//!
//! Wires the registry, the matcher, the blob store, and the embedder into
//! the externally exposed operations. The facade owns two concerns the
//! lower layers stay ignorant of: where photo bytes live (storage paths),
//! and the concurrent per-photo embedding fan-out with its per-call
//! timeout.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use strayid_blob::{BlobError, BlobStore};
use strayid_embed::{EmbedError, Embedder};
use strayid_kv::KVStore;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::error::ReidError;
use crate::keys;
use crate::matcher::Matcher;
use crate::page;
use crate::rank::{rank, round4};
use crate::registry::ProfileRegistry;
use crate::types::{
    GeoPoint, MatchResult, MatchStatus, NewProfile, NewSighting, Page, PhotoAngle, PhotoMeta,
    Profile, ProfileUpdate, Sighting, SightingStatus, Species,
};

/// Photo metadata paired with a time-limited retrieval URL.
#[derive(Debug, Clone)]
pub struct PhotoView {
    pub meta: PhotoMeta,
    pub url: String,
}

pub struct ReidService {
    store: Arc<dyn KVStore>,
    blobs: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    registry: ProfileRegistry,
    matcher: Matcher,
    cfg: Config,
}

impl ReidService {
    pub fn new(
        store: Arc<dyn KVStore>,
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        cfg: Config,
    ) -> Self {
        let cfg = cfg.with_defaults();
        Self {
            registry: ProfileRegistry::new(store.clone(), cfg.clone()),
            matcher: Matcher::new(store.clone(), cfg.clone()),
            store,
            blobs,
            embedder,
            cfg,
        }
    }

    // ---- profiles ----

    pub fn create_profile(&self, new: NewProfile) -> Result<Profile, ReidError> {
        self.registry.create(new)
    }

    /// Register a stray with its initial photo set in one shot.
    ///
    /// Every photo is stored and registered; the `Face` photo (if any) is
    /// additionally embedded and the embedding attached. An embedder
    /// failure degrades to a profile without biometrics rather than
    /// failing the registration.
    pub async fn intake(
        &self,
        new: NewProfile,
        photos: Vec<(Vec<u8>, Option<PhotoAngle>)>,
    ) -> Result<Profile, ReidError> {
        if photos.len() as u32 > self.cfg.max_photos_per_profile {
            return Err(ReidError::LimitExceeded(format!(
                "maximum of {} photos per profile",
                self.cfg.max_photos_per_profile
            )));
        }

        let profile = self.registry.create(new)?;
        let mut face_bytes: Option<&[u8]> = None;
        for (bytes, angle) in &photos {
            if *angle == Some(PhotoAngle::Face) {
                face_bytes = Some(bytes);
            }
            self.store_photo(&profile.id, bytes, *angle)?;
        }

        if let Some(bytes) = face_bytes {
            match self.embed_one(bytes).await {
                Ok(embedding) => {
                    return self.registry.attach_embedding(
                        &profile.id,
                        embedding.vector,
                        &embedding.model_version,
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        profile_id = %profile.id,
                        error = %err,
                        "face embedding failed, registering without biometrics"
                    );
                }
            }
        }
        self.registry.get(&profile.id)
    }

    pub fn get_profile(&self, profile_id: &str) -> Result<Profile, ReidError> {
        self.registry.get(profile_id)
    }

    pub fn update_profile(
        &self,
        profile_id: &str,
        upd: ProfileUpdate,
    ) -> Result<Profile, ReidError> {
        self.registry.update(profile_id, upd)
    }

    /// Upload a photo and register its metadata.
    ///
    /// Quota is checked before the blob write so a rejected upload never
    /// leaves an orphaned object behind.
    pub fn add_photo(
        &self,
        profile_id: &str,
        bytes: &[u8],
        angle: Option<PhotoAngle>,
    ) -> Result<PhotoMeta, ReidError> {
        let profile = self.registry.get(profile_id)?;
        if profile.photo_count >= self.cfg.max_photos_per_profile {
            return Err(ReidError::LimitExceeded(format!(
                "maximum of {} photos per profile",
                self.cfg.max_photos_per_profile
            )));
        }
        self.store_photo(profile_id, bytes, angle)
    }

    /// Remove a photo's metadata and its stored bytes.
    pub fn remove_photo(&self, profile_id: &str, photo_id: &str) -> Result<(), ReidError> {
        let meta = self.registry.remove_photo(profile_id, photo_id)?;
        match self.blobs.delete(&meta.storage_path) {
            Ok(()) | Err(BlobError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// A profile's photos, oldest first, each with a retrieval URL.
    pub fn profile_photos(&self, profile_id: &str) -> Result<Vec<PhotoView>, ReidError> {
        let mut out = Vec::new();
        for meta in self.registry.photos(profile_id)? {
            let url = self.blobs.url(&meta.storage_path, self.cfg.url_ttl_secs)?;
            out.push(PhotoView { meta, url });
        }
        Ok(out)
    }

    /// Record a confirmed field encounter on the profile's sighting log.
    pub fn confirm_sighting(
        &self,
        profile_id: &str,
        location: GeoPoint,
    ) -> Result<Profile, ReidError> {
        if !location.is_valid() {
            return Err(ReidError::Validation(format!(
                "invalid coordinates ({}, {})",
                location.latitude, location.longitude
            )));
        }
        self.registry.append_sighting(profile_id, location, Utc::now())
    }

    pub fn list_profiles(
        &self,
        species: Option<Species>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page<Profile>, ReidError> {
        let limit = self.resolve_limit(limit)?;
        page::list_index(
            self.store.as_ref(),
            keys::profile_ts_prefix(),
            cursor,
            limit,
            |id| self.registry.try_get(id),
            |p: &Profile| keys::profile_ts_key(p.created_at.timestamp_micros(), &p.id),
            |p| species.is_none() || Some(p.attrs.species) == species,
            |p| p.id.clone(),
        )
    }

    /// Delete a profile, its photos' bytes, and every derived record.
    pub fn delete_profile(&self, profile_id: &str) -> Result<(), ReidError> {
        self.registry.get(profile_id)?;
        self.blobs
            .delete_prefix(&format!("profiles/{profile_id}/"))?;
        self.registry.delete(profile_id)
    }

    /// One-shot photo lookup: embed the query photos in memory and rank
    /// against every embedded profile. Nothing is persisted.
    pub async fn search_profiles(
        &self,
        photos: &[Vec<u8>],
    ) -> Result<Vec<(Profile, f32)>, ReidError> {
        if photos.is_empty() {
            return Err(ReidError::Validation(
                "at least one query photo is required".to_string(),
            ));
        }
        let (attempts, _) = self.embed_all(photos).await;
        let Some(query) = aggregate(&attempts) else {
            return Err(ReidError::Unavailable(
                "no embedding could be computed from the query photos".to_string(),
            ));
        };

        let mut profiles = std::collections::HashMap::new();
        let mut candidates = Vec::new();
        for profile in self.registry.list_with_embedding()? {
            if let Some(vec) = profile.biometrics.embedding.clone() {
                candidates.push((profile.id.clone(), vec));
                profiles.insert(profile.id.clone(), profile);
            }
        }
        let scored = rank(
            &query,
            candidates,
            self.cfg.similarity_threshold,
            self.cfg.max_match_results,
        );
        Ok(scored
            .into_iter()
            .filter_map(|s| {
                let profile = profiles.remove(&s.id)?;
                Some((profile, round4(s.score)))
            })
            .collect())
    }

    // ---- sightings ----

    /// Report a sighting: upload the photos, persist the record, then run
    /// the embed+match pipeline. Per-photo embedding calls run
    /// concurrently, each bounded by the configured timeout.
    pub async fn create_sighting(
        &self,
        new: NewSighting,
        photos: Vec<Vec<u8>>,
    ) -> Result<Sighting, ReidError> {
        if photos.is_empty() {
            return Err(ReidError::Validation(
                "at least one photo is required".to_string(),
            ));
        }
        if !new.location.is_valid() {
            return Err(ReidError::Validation(format!(
                "invalid coordinates ({}, {})",
                new.location.latitude, new.location.longitude
            )));
        }

        let id = Uuid::new_v4().simple().to_string();
        let mut paths = Vec::with_capacity(photos.len());
        for (i, bytes) in photos.iter().enumerate() {
            let path = format!("sightings/{id}/photo_{i}.jpg");
            self.blobs.put(&path, bytes)?;
            paths.push(path);
        }
        let sighting = self.matcher.create_with_id(id, new, paths)?;

        let (attempts, model_version) = self.embed_all(&photos).await;
        self.matcher
            .embed_and_match(&sighting.id, &attempts, model_version.as_deref())
    }

    pub fn get_sighting(&self, sighting_id: &str) -> Result<Sighting, ReidError> {
        self.matcher.get(sighting_id)
    }

    /// Retrieval URLs for a sighting's stored photos.
    pub fn sighting_photos(&self, sighting_id: &str) -> Result<Vec<String>, ReidError> {
        let sighting = self.matcher.get(sighting_id)?;
        sighting
            .photo_paths
            .iter()
            .map(|p| Ok(self.blobs.url(p, self.cfg.url_ttl_secs)?))
            .collect()
    }

    /// Retry the embed+match pipeline from the stored photo bytes. A photo
    /// whose bytes are gone counts as one failed attempt, not a hard error.
    pub async fn reembed(&self, sighting_id: &str) -> Result<Sighting, ReidError> {
        let sighting = self.matcher.get(sighting_id)?;
        let mut photos = Vec::new();
        let mut missing = 0usize;
        for path in &sighting.photo_paths {
            match self.blobs.get(path) {
                Ok(bytes) => photos.push(bytes),
                Err(err) => {
                    tracing::warn!(sighting_id, path = %path, error = %err, "photo bytes unavailable");
                    missing += 1;
                }
            }
        }

        let (mut attempts, model_version) = self.embed_all(&photos).await;
        for _ in 0..missing {
            attempts.push(Err(EmbedError::Unavailable(
                "stored photo unavailable".to_string(),
            )));
        }
        self.matcher
            .embed_and_match(sighting_id, &attempts, model_version.as_deref())
    }

    pub fn list_sightings(
        &self,
        status: Option<SightingStatus>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page<Sighting>, ReidError> {
        let limit = self.resolve_limit(limit)?;
        page::list_index(
            self.store.as_ref(),
            keys::sighting_ts_prefix(),
            cursor,
            limit,
            |id| self.matcher.try_get(id),
            |s: &Sighting| keys::sighting_ts_key(s.created_at.timestamp_micros(), &s.id),
            |s| status.is_none() || Some(s.status) == status,
            |s| s.id.clone(),
        )
    }

    // ---- matches ----

    pub fn get_matches(&self, sighting_id: &str) -> Result<MatchResult, ReidError> {
        self.matcher.get_matches(sighting_id)
    }

    pub fn submit_feedback(
        &self,
        sighting_id: &str,
        status: MatchStatus,
        confirmed_profile_id: Option<String>,
    ) -> Result<MatchResult, ReidError> {
        self.matcher
            .submit_feedback(sighting_id, status, confirmed_profile_id)
    }

    // ---- internals ----

    fn store_photo(
        &self,
        profile_id: &str,
        bytes: &[u8],
        angle: Option<PhotoAngle>,
    ) -> Result<PhotoMeta, ReidError> {
        let photo_id = Uuid::new_v4().simple().to_string();
        let path = format!("profiles/{profile_id}/photos/{photo_id}.jpg");
        self.blobs.put(&path, bytes)?;
        let meta = PhotoMeta {
            id: photo_id,
            storage_path: path,
            uploaded_at: Utc::now(),
            angle,
        };
        self.registry.add_photo(profile_id, meta)
    }

    async fn embed_one(&self, bytes: &[u8]) -> Result<strayid_embed::Embedding, EmbedError> {
        match tokio::time::timeout(self.cfg.embed_timeout, self.embedder.embed(bytes)).await {
            Ok(result) => result,
            Err(_) => Err(EmbedError::Timeout),
        }
    }

    /// Fan out one embedding call per photo, all concurrent, each bounded
    /// by the configured timeout. Returns the per-photo attempts in input
    /// order plus the model version of the first success.
    async fn embed_all(
        &self,
        photos: &[Vec<u8>],
    ) -> (Vec<Result<Vec<f32>, EmbedError>>, Option<String>) {
        let calls = photos.iter().map(|bytes| self.embed_one(bytes));
        let results = join_all(calls).await;

        let mut attempts = Vec::with_capacity(results.len());
        let mut model_version = None;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(embedding) => {
                    if model_version.is_none() {
                        model_version = Some(embedding.model_version);
                    }
                    attempts.push(Ok(embedding.vector));
                }
                Err(err) => {
                    tracing::warn!(photo = i, error = %err, "embedding attempt failed");
                    attempts.push(Err(err));
                }
            }
        }
        (attempts, model_version)
    }

    fn resolve_limit(&self, limit: usize) -> Result<usize, ReidError> {
        if limit == 0 {
            return Ok(self.cfg.default_page_limit);
        }
        if limit > self.cfg.max_page_limit {
            return Err(ReidError::Validation(format!(
                "page limit {} exceeds maximum {}",
                limit, self.cfg.max_page_limit
            )));
        }
        Ok(limit)
    }
}

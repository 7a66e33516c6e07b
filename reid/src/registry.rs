//! Profile aggregate mutation.
//!
//! Owns sequence numbering, photo attachment and quota, the canonical
//! (face) photo designation, embedding attachment, and the sighting
//! confirmation log. All writes are single-record last-write-wins
//! overwrites except the sequence counter, which goes through the store's
//! atomic increment.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strayid_kv::KVStore;
use uuid::Uuid;

use crate::codec::{decode, encode};
use crate::config::Config;
use crate::error::ReidError;
use crate::keys;
use crate::types::{
    GeoPoint, NewProfile, PhotoAngle, PhotoMeta, Profile, ProfileUpdate, SightingEntry,
};

pub struct ProfileRegistry {
    store: Arc<dyn KVStore>,
    cfg: Config,
}

impl ProfileRegistry {
    pub fn new(store: Arc<dyn KVStore>, cfg: Config) -> Self {
        Self {
            store,
            cfg: cfg.with_defaults(),
        }
    }

    /// Create a profile with a globally unique, monotonically increasing
    /// sequence number.
    ///
    /// The number comes from the store's atomic increment-and-read, never
    /// from a read-then-write, so concurrent creations cannot collide.
    pub fn create(&self, new: NewProfile) -> Result<Profile, ReidError> {
        let number = self.store.increment(keys::SEQ_PROFILE, 1)? as u64;
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4().simple().to_string(),
            number,
            name: new
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("stray-{number:05}")),
            attrs: new.attrs,
            photo_count: 0,
            biometrics: Default::default(),
            sightings: Vec::new(),
            last_seen_location: None,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        };
        self.put_indexed(&profile)?;
        Ok(profile)
    }

    /// Fetch a profile. Errors with NotFound when absent.
    pub fn get(&self, profile_id: &str) -> Result<Profile, ReidError> {
        self.try_get(profile_id)?
            .ok_or_else(|| ReidError::NotFound(format!("profile {profile_id}")))
    }

    /// Fetch a profile, `None` when absent.
    pub fn try_get(&self, profile_id: &str) -> Result<Option<Profile>, ReidError> {
        match self.store.get(&keys::profile_key(profile_id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update. Errors with Validation when no fields are
    /// supplied, so an empty request never touches the record.
    pub fn update(&self, profile_id: &str, upd: ProfileUpdate) -> Result<Profile, ReidError> {
        if upd.is_empty() {
            return Err(ReidError::Validation("no fields to update".to_string()));
        }
        let mut profile = self.get(profile_id)?;
        if let Some(name) = upd.name {
            profile.name = name;
        }
        if let Some(species) = upd.species {
            profile.attrs.species = species;
        }
        if let Some(sex) = upd.sex {
            profile.attrs.sex = sex;
        }
        if let Some(breed) = upd.breed {
            profile.attrs.breed = breed;
        }
        if let Some(color) = upd.color_description {
            profile.attrs.color_description = color;
        }
        if let Some(features) = upd.distinguishing_features {
            profile.attrs.distinguishing_features = features;
        }
        if let Some(age) = upd.estimated_age_months {
            profile.attrs.estimated_age_months = Some(age);
        }
        if let Some(loc) = upd.location_found {
            profile.attrs.location_found = Some(loc);
        }
        if let Some(notes) = upd.notes {
            profile.attrs.notes = notes;
        }
        profile.updated_at = Utc::now();
        self.put(&profile)?;
        Ok(profile)
    }

    /// Attach a photo metadata record, minted by the caller once the
    /// underlying blob is stored.
    ///
    /// Enforces the photo quota, increments photo_count, and makes the
    /// photo canonical when tagged `Face` (a previous canonical photo is
    /// silently superseded; last write wins).
    pub fn add_photo(&self, profile_id: &str, meta: PhotoMeta) -> Result<PhotoMeta, ReidError> {
        let mut profile = self.get(profile_id)?;
        if profile.photo_count >= self.cfg.max_photos_per_profile {
            return Err(ReidError::LimitExceeded(format!(
                "maximum of {} photos per profile",
                self.cfg.max_photos_per_profile
            )));
        }

        profile.photo_count += 1;
        if meta.angle == Some(PhotoAngle::Face) {
            profile.biometrics.face_photo_id = Some(meta.id.clone());
        }
        profile.updated_at = Utc::now();

        let photo_k = keys::photo_key(profile_id, &meta.id);
        let profile_k = keys::profile_key(profile_id);
        let photo_doc = encode(&meta)?;
        let profile_doc = encode(&profile)?;
        self.store.batch_set(&[
            (photo_k.as_str(), photo_doc.as_slice()),
            (profile_k.as_str(), profile_doc.as_slice()),
        ])?;
        Ok(meta)
    }

    /// Remove a photo metadata record, returning it so the caller can
    /// release the underlying blob.
    ///
    /// If the removed photo was canonical, face_photo_id is cleared and no
    /// replacement is promoted; designating a new canonical photo is an
    /// explicit follow-up action.
    pub fn remove_photo(&self, profile_id: &str, photo_id: &str) -> Result<PhotoMeta, ReidError> {
        let mut profile = self.get(profile_id)?;
        let photo_k = keys::photo_key(profile_id, photo_id);
        let meta: PhotoMeta = match self.store.get(&photo_k)? {
            Some(data) => decode(&data)?,
            None => return Err(ReidError::NotFound(format!("photo {photo_id}"))),
        };

        profile.photo_count = profile.photo_count.saturating_sub(1);
        if profile.biometrics.face_photo_id.as_deref() == Some(photo_id) {
            profile.biometrics.face_photo_id = None;
        }
        profile.updated_at = Utc::now();

        self.store.delete(&photo_k)?;
        self.put(&profile)?;
        Ok(meta)
    }

    /// List a profile's photo metadata, oldest upload first.
    pub fn photos(&self, profile_id: &str) -> Result<Vec<PhotoMeta>, ReidError> {
        self.get(profile_id)?;
        let mut photos = Vec::new();
        for (_key, data) in self.store.scan(&keys::photo_prefix(profile_id))? {
            photos.push(decode::<PhotoMeta>(&data)?);
        }
        photos.sort_by_key(|p| p.uploaded_at);
        Ok(photos)
    }

    /// Attach an identity embedding and mark the profile embedded, both in
    /// the record and in the query-layer marker index.
    pub fn attach_embedding(
        &self,
        profile_id: &str,
        vector: Vec<f32>,
        model_version: &str,
    ) -> Result<Profile, ReidError> {
        let mut profile = self.get(profile_id)?;
        profile.biometrics.embedding = Some(vector);
        profile.biometrics.model_version = Some(model_version.to_string());
        profile.biometrics.has_embedding = true;
        profile.updated_at = Utc::now();

        let profile_k = keys::profile_key(profile_id);
        let marker_k = keys::profile_emb_key(profile_id);
        let doc = encode(&profile)?;
        self.store.batch_set(&[
            (profile_k.as_str(), doc.as_slice()),
            (marker_k.as_str(), profile_id.as_bytes()),
        ])?;
        Ok(profile)
    }

    /// Append a confirmed sighting to the log and refresh the last_seen
    /// snapshot fields.
    pub fn append_sighting(
        &self,
        profile_id: &str,
        location: GeoPoint,
        timestamp: DateTime<Utc>,
    ) -> Result<Profile, ReidError> {
        let mut profile = self.get(profile_id)?;
        profile.sightings.push(SightingEntry {
            timestamp,
            location,
        });
        profile.last_seen_location = Some(location);
        profile.last_seen_at = Some(timestamp);
        profile.updated_at = Utc::now();
        self.put(&profile)?;
        Ok(profile)
    }

    /// Delete a profile and cascade its photo metadata and index entries.
    /// Blob removal is the caller's responsibility.
    pub fn delete(&self, profile_id: &str) -> Result<(), ReidError> {
        let profile = self.get(profile_id)?;

        let mut to_delete = vec![
            keys::profile_key(profile_id),
            keys::profile_ts_key(profile.created_at.timestamp_micros(), profile_id),
            keys::profile_emb_key(profile_id),
        ];
        for (key, _) in self.store.scan(&keys::photo_prefix(profile_id))? {
            to_delete.push(key);
        }
        let refs: Vec<&str> = to_delete.iter().map(|k| k.as_str()).collect();
        self.store.batch_delete(&refs)?;
        Ok(())
    }

    /// Candidate population for search-time matching: only profiles with
    /// an embedding, filtered through the marker index rather than by
    /// scanning and discarding.
    pub fn list_with_embedding(&self) -> Result<Vec<Profile>, ReidError> {
        let mut profiles = Vec::new();
        for (_key, value) in self.store.scan(keys::profile_emb_prefix())? {
            let id = String::from_utf8_lossy(&value);
            if let Some(profile) = self.try_get(&id)? {
                if profile.biometrics.has_embedding && profile.biometrics.embedding.is_some() {
                    profiles.push(profile);
                }
            }
        }
        Ok(profiles)
    }

    fn put(&self, profile: &Profile) -> Result<(), ReidError> {
        let doc = encode(profile)?;
        self.store.set(&keys::profile_key(&profile.id), &doc)?;
        Ok(())
    }

    fn put_indexed(&self, profile: &Profile) -> Result<(), ReidError> {
        let doc = encode(profile)?;
        let doc_k = keys::profile_key(&profile.id);
        let idx_k = keys::profile_ts_key(profile.created_at.timestamp_micros(), &profile.id);
        self.store.batch_set(&[
            (doc_k.as_str(), doc.as_slice()),
            (idx_k.as_str(), profile.id.as_bytes()),
        ])?;
        Ok(())
    }
}

//! Profile commands: intake, photos, listing, search, lifecycle.

use clap::{Args, Subcommand};
use strayid_reid::{GeoPoint, NewProfile, PhotoAngle, ProfileAttrs, ReidService};

use super::{open_service, parse_enum, print_json, profile_line, read_photo};
use crate::Cli;

/// Register and manage animal profiles.
#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand)]
enum ProfileSubcommand {
    /// Register a stray with its initial photos
    Intake {
        /// Display name (auto-generated when omitted)
        #[arg(short = 'n', long)]
        name: Option<String>,
        /// Species (dog, cat)
        #[arg(short = 's', long)]
        species: Option<String>,
        /// Breed description
        #[arg(long)]
        breed: Option<String>,
        /// Face photo file (used for the identity embedding)
        #[arg(long)]
        face: Option<String>,
        /// Additional photo files
        #[arg(short = 'p', long = "photo")]
        photos: Vec<String>,
    },
    /// Show a profile and its photos
    Show {
        /// Profile id
        id: String,
    },
    /// List profiles, newest first
    List {
        /// Filter by species (dog, cat)
        #[arg(short = 's', long)]
        species: Option<String>,
        /// Resume from this cursor
        #[arg(long)]
        cursor: Option<String>,
        /// Page size (0 = server default)
        #[arg(short = 'l', long, default_value_t = 0)]
        limit: usize,
    },
    /// Upload one more photo
    AddPhoto {
        /// Profile id
        id: String,
        /// Photo file
        file: String,
        /// Camera angle (face, left_side, right_side, front, back)
        #[arg(short = 'a', long)]
        angle: Option<String>,
    },
    /// Remove a photo and its stored bytes
    RemovePhoto {
        /// Profile id
        id: String,
        /// Photo id
        photo_id: String,
    },
    /// Record a confirmed field encounter
    Confirm {
        /// Profile id
        id: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },
    /// Find registered profiles that look like the given photos
    Search {
        /// Query photo files
        #[arg(required = true)]
        photos: Vec<String>,
    },
    /// Delete a profile and everything derived from it
    Delete {
        /// Profile id
        id: String,
    },
}

impl ProfileCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        match &self.command {
            ProfileSubcommand::Intake {
                name,
                species,
                breed,
                face,
                photos,
            } => {
                let mut attrs = ProfileAttrs::default();
                if let Some(s) = species {
                    attrs.species = parse_enum(s)?;
                }
                if let Some(b) = breed {
                    attrs.breed = b.clone();
                }
                let new = NewProfile {
                    name: name.clone(),
                    attrs,
                };

                let mut batch = Vec::new();
                if let Some(path) = face {
                    batch.push((read_photo(path)?, Some(PhotoAngle::Face)));
                }
                for path in photos {
                    batch.push((read_photo(path)?, None));
                }

                let profile = svc.intake(new, batch).await?;
                if cli.json {
                    print_json(&profile)?;
                } else {
                    println!("{}", profile_line(&profile));
                }
                Ok(())
            }
            ProfileSubcommand::Show { id } => self.show(cli, &svc, id),
            ProfileSubcommand::List {
                species,
                cursor,
                limit,
            } => {
                let species = species.as_deref().map(parse_enum).transpose()?;
                let page = svc.list_profiles(species, cursor.as_deref(), *limit)?;
                if cli.json {
                    print_json(&page)?;
                } else {
                    for p in &page.items {
                        println!("{}", profile_line(p));
                    }
                    if let Some(c) = &page.next_cursor {
                        println!("next cursor: {c}");
                    }
                }
                Ok(())
            }
            ProfileSubcommand::AddPhoto { id, file, angle } => {
                let angle = angle.as_deref().map(parse_enum).transpose()?;
                let meta = svc.add_photo(id, &read_photo(file)?, angle)?;
                if cli.json {
                    print_json(&meta)?;
                } else {
                    println!("photo {} stored at {}", meta.id, meta.storage_path);
                }
                Ok(())
            }
            ProfileSubcommand::RemovePhoto { id, photo_id } => {
                svc.remove_photo(id, photo_id)?;
                if !cli.json {
                    println!("photo {photo_id} removed");
                }
                Ok(())
            }
            ProfileSubcommand::Confirm { id, lat, lon } => {
                let profile = svc.confirm_sighting(id, GeoPoint::new(*lat, *lon))?;
                if cli.json {
                    print_json(&profile)?;
                } else {
                    println!(
                        "{} confirmed at ({lat}, {lon}), {} sightings on record",
                        profile.name,
                        profile.sightings.len()
                    );
                }
                Ok(())
            }
            ProfileSubcommand::Search { photos } => {
                let mut query = Vec::new();
                for path in photos {
                    query.push(read_photo(path)?);
                }
                let hits = svc.search_profiles(&query).await?;
                if cli.json {
                    let rows: Vec<_> = hits
                        .iter()
                        .map(|(p, score)| serde_json::json!({ "score": score, "profile": p }))
                        .collect();
                    print_json(&rows)?;
                } else if hits.is_empty() {
                    println!("no profiles above threshold");
                } else {
                    for (p, score) in &hits {
                        println!("{score:.4}  {}", profile_line(p));
                    }
                }
                Ok(())
            }
            ProfileSubcommand::Delete { id } => {
                svc.delete_profile(id)?;
                if !cli.json {
                    println!("profile {id} deleted");
                }
                Ok(())
            }
        }
    }

    fn show(&self, cli: &Cli, svc: &ReidService, id: &str) -> anyhow::Result<()> {
        let profile = svc.get_profile(id)?;
        let photos = svc.profile_photos(id)?;
        if cli.json {
            print_json(&serde_json::json!({
                "profile": profile,
                "photos": photos
                    .iter()
                    .map(|v| serde_json::json!({ "meta": v.meta, "url": v.url }))
                    .collect::<Vec<_>>(),
            }))?;
            return Ok(());
        }

        println!("{}", profile_line(&profile));
        if let Some(loc) = &profile.last_seen_location {
            println!(
                "last seen: ({}, {}) at {}",
                loc.latitude,
                loc.longitude,
                profile
                    .last_seen_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default()
            );
        }
        for v in &photos {
            let angle = v
                .meta
                .angle
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  photo {}  angle={}  {}", v.meta.id, angle, v.url);
        }
        Ok(())
    }
}

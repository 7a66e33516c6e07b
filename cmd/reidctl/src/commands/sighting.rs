//! Sighting commands: reporting, match results, feedback.

use clap::{Args, Subcommand};
use strayid_reid::{GeoPoint, MatchStatus, NewSighting, Sighting};

use super::{open_service, parse_enum, print_json, read_photo};
use crate::Cli;

/// Report sightings and work with match results.
#[derive(Args)]
pub struct SightingCommand {
    #[command(subcommand)]
    command: SightingSubcommand,
}

#[derive(Subcommand)]
enum SightingSubcommand {
    /// Report a sighting and run matching
    Report {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Tag (repeatable)
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        /// Photo files
        #[arg(required = true)]
        photos: Vec<String>,
    },
    /// Show a sighting
    Show {
        /// Sighting id
        id: String,
    },
    /// List sightings, newest first
    List {
        /// Filter by status (pending, processing, matched, no_match)
        #[arg(short = 's', long)]
        status: Option<String>,
        /// Resume from this cursor
        #[arg(long)]
        cursor: Option<String>,
        /// Page size (0 = server default)
        #[arg(short = 'l', long, default_value_t = 0)]
        limit: usize,
    },
    /// Re-run embedding and matching from the stored photos
    Reembed {
        /// Sighting id
        id: String,
    },
    /// Show the ranked match candidates
    Matches {
        /// Sighting id
        id: String,
    },
    /// Record human feedback on a match result
    Feedback {
        /// Sighting id
        id: String,
        /// Verdict (confirmed, rejected)
        #[arg(short = 's', long)]
        status: String,
        /// Profile the sighting was matched to
        #[arg(short = 'p', long)]
        profile: Option<String>,
    },
}

impl SightingCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        match &self.command {
            SightingSubcommand::Report {
                lat,
                lon,
                notes,
                tags,
                photos,
            } => {
                let mut bytes = Vec::new();
                for path in photos {
                    bytes.push(read_photo(path)?);
                }
                let new = NewSighting {
                    location: GeoPoint::new(*lat, *lon),
                    notes: notes.clone().unwrap_or_default(),
                    tags: tags.clone(),
                };
                let sighting = svc.create_sighting(new, bytes).await?;
                self.emit(cli, &sighting)
            }
            SightingSubcommand::Show { id } => {
                let sighting = svc.get_sighting(id)?;
                if cli.json {
                    let urls = svc.sighting_photos(id)?;
                    print_json(&serde_json::json!({ "sighting": sighting, "photos": urls }))
                } else {
                    self.emit(cli, &sighting)?;
                    for url in svc.sighting_photos(id)? {
                        println!("  photo {url}");
                    }
                    Ok(())
                }
            }
            SightingSubcommand::List {
                status,
                cursor,
                limit,
            } => {
                let status = status.as_deref().map(parse_enum).transpose()?;
                let page = svc.list_sightings(status, cursor.as_deref(), *limit)?;
                if cli.json {
                    print_json(&page)
                } else {
                    for s in &page.items {
                        println!("{}", sighting_line(s));
                    }
                    if let Some(c) = &page.next_cursor {
                        println!("next cursor: {c}");
                    }
                    Ok(())
                }
            }
            SightingSubcommand::Reembed { id } => {
                let sighting = svc.reembed(id).await?;
                self.emit(cli, &sighting)
            }
            SightingSubcommand::Matches { id } => {
                let result = svc.get_matches(id)?;
                if cli.json {
                    print_json(&result)
                } else {
                    println!(
                        "sighting {}  verdict={}  confirmed={}",
                        result.sighting_id,
                        result.status,
                        result.confirmed_profile_id.as_deref().unwrap_or("-")
                    );
                    for c in &result.candidates {
                        println!("  {:.4}  {}", c.score, c.sighting_id);
                    }
                    Ok(())
                }
            }
            SightingSubcommand::Feedback {
                id,
                status,
                profile,
            } => {
                let status: MatchStatus = parse_enum(status)?;
                let result = svc.submit_feedback(id, status, profile.clone())?;
                if cli.json {
                    print_json(&result)
                } else {
                    println!(
                        "sighting {} now {}",
                        result.sighting_id, result.status
                    );
                    Ok(())
                }
            }
        }
    }

    fn emit(&self, cli: &Cli, sighting: &Sighting) -> anyhow::Result<()> {
        if cli.json {
            print_json(sighting)
        } else {
            println!("{}", sighting_line(sighting));
            Ok(())
        }
    }
}

fn sighting_line(s: &Sighting) -> String {
    format!(
        "{}  {}  ({}, {})  photos={}  {}",
        s.id,
        s.status,
        s.location.latitude,
        s.location.longitude,
        s.photo_paths.len(),
        s.created_at.to_rfc3339()
    )
}

mod results;
mod runs;
mod sessions;
mod sightings;

// ========================================================================================
//
//                           Grouping of single-ALT rows by site
//
// ========================================================================================
//
// Input rows are sorted by (chromosome, position) and carry one ALT allele each. Rows that
// share chromosome, position and reference allele are folded into one multi-allelic
// variant. A site seen only once is written as a plain bi-allelic variant, so nothing is
// handed to the factory until a second row proves the site is multi-allelic.

use crate::config::ColumnLayout;
use crate::error::PgenError;
use crate::factory::RecordFactory;
use crate::pgen::{PgenOutputStream, PgenSummary};
use crate::pvar::PvarWriter;
use crate::row::GenotypeRow;
use crate::writer::{RowFields, default_variant_id};
use itertools::Itertools;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SiteKey {
    chromosome: String,
    position: u64,
    reference: String,
}

impl SiteKey {
    fn matches(&self, chromosome: &str, position: u64, reference: &str) -> bool {
        self.position == position && self.chromosome == chromosome && self.reference == reference
    }
}

/// The one row seen so far at a site.
#[derive(Debug)]
struct LazySite {
    key: SiteKey,
    alt: String,
    id: Option<String>,
    values: String,
}

/// A site with at least two rows, whose columns already sit in the factory.
#[derive(Debug)]
struct GroupedSite {
    key: SiteKey,
    alts: Vec<String>,
    id: Option<String>,
}

#[derive(Debug, Default)]
enum SiteState {
    #[default]
    Empty,
    Lazy(LazySite),
    Grouped(GroupedSite),
}

#[derive(Debug)]
pub struct GroupingWriter {
    pgen: PgenOutputStream,
    pvar: PvarWriter,
    factory: RecordFactory,
    columns: ColumnLayout,
    state: SiteState,
}

impl GroupingWriter {
    /// Fails with `ImputedGrouping` for an imputed factory, which cannot merge columns.
    pub fn new(
        pgen: PgenOutputStream,
        pvar: PvarWriter,
        factory: RecordFactory,
        columns: ColumnLayout,
    ) -> Result<Self, PgenError> {
        if factory.is_imputed() {
            return Err(PgenError::ImputedGrouping);
        }
        Ok(Self {
            pgen,
            pvar,
            factory,
            columns,
            state: SiteState::Empty,
        })
    }

    pub fn write_row<R: GenotypeRow + ?Sized>(&mut self, row: &R) -> Result<(), PgenError> {
        let fields = RowFields::read(row, &self.columns)?;
        let chromosome = row.chromosome();
        let position = row.position();

        // A rejected row leaves the current site and the factory as they were.
        let next = match std::mem::take(&mut self.state) {
            SiteState::Lazy(site) if site.key.matches(chromosome, position, fields.reference) => {
                let added = self
                    .factory
                    .add(&site.values)
                    .and_then(|()| self.factory.add(fields.values));
                if let Err(err) = added {
                    self.factory.discard_pending();
                    self.state = SiteState::Lazy(site);
                    return Err(err);
                }
                SiteState::Grouped(GroupedSite {
                    key: site.key,
                    alts: vec![site.alt, fields.alt.to_string()],
                    id: site.id.or_else(|| fields.id.map(str::to_string)),
                })
            }
            SiteState::Grouped(mut site)
                if site.key.matches(chromosome, position, fields.reference) =>
            {
                if let Err(err) = self.factory.add(fields.values) {
                    self.state = SiteState::Grouped(site);
                    return Err(err);
                }
                site.alts.push(fields.alt.to_string());
                if site.id.is_none() {
                    site.id = fields.id.map(str::to_string);
                }
                SiteState::Grouped(site)
            }
            previous => {
                self.flush(previous)?;
                SiteState::Lazy(LazySite {
                    key: SiteKey {
                        chromosome: chromosome.to_string(),
                        position,
                        reference: fields.reference.to_string(),
                    },
                    alt: fields.alt.to_string(),
                    id: fields.id.map(str::to_string),
                    values: fields.values.to_string(),
                })
            }
        };
        self.state = next;
        Ok(())
    }

    /// Writes the variant for a finished site. Each call makes one .pgen write paired with
    /// one .pvar line.
    fn flush(&mut self, state: SiteState) -> Result<(), PgenError> {
        match state {
            SiteState::Empty => Ok(()),
            SiteState::Lazy(site) => {
                let mut record = self.factory.parse(&site.values)?;
                self.pgen.write(&mut record)?;
                let id = site.id.unwrap_or_else(|| {
                    default_variant_id(
                        &site.key.chromosome,
                        site.key.position,
                        &site.alt,
                        &site.key.reference,
                    )
                });
                self.pvar.write(
                    &site.key.chromosome,
                    site.key.position,
                    &id,
                    &site.key.reference,
                    &site.alt,
                )
            }
            SiteState::Grouped(site) => {
                let mut record = self.factory.merge()?;
                self.pgen.write(&mut record)?;
                let alt = site.alts.iter().join(",");
                debug!(
                    "Merged {} ALT alleles at {}:{}",
                    site.alts.len(),
                    site.key.chromosome,
                    site.key.position
                );
                let id = site.id.unwrap_or_else(|| {
                    default_variant_id(
                        &site.key.chromosome,
                        site.key.position,
                        &alt,
                        &site.key.reference,
                    )
                });
                self.pvar.write(
                    &site.key.chromosome,
                    site.key.position,
                    &id,
                    &site.key.reference,
                    &alt,
                )
            }
        }
    }

    /// Flushes the last site and closes both files.
    pub fn close(mut self) -> Result<Option<PgenSummary>, PgenError> {
        let last = std::mem::take(&mut self.state);
        self.flush(last)?;
        let summary = self.pgen.close()?;
        self.pvar.close()?;
        Ok(summary)
    }
}

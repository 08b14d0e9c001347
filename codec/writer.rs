// ========================================================================================
//
//                               Paired .pgen/.pvar writers
//
// ========================================================================================

use crate::config::{ColumnLayout, WriterConfig};
use crate::error::PgenError;
use crate::factory::RecordFactory;
use crate::grouping::GroupingWriter;
use crate::pgen::{PgenMode, PgenOutputStream, PgenSummary};
use crate::pvar::PvarWriter;
use crate::row::GenotypeRow;
use log::info;
use std::path::{Path, PathBuf};

/// ID written when no row at a site carries one.
pub fn default_variant_id(chromosome: &str, position: u64, alt: &str, reference: &str) -> String {
    format!("{chromosome}:{position}:{alt}:{reference}")
}

/// The columns of one row that end up in the output.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowFields<'a> {
    pub(crate) reference: &'a str,
    pub(crate) alt: &'a str,
    pub(crate) id: Option<&'a str>,
    pub(crate) values: &'a str,
}

impl<'a> RowFields<'a> {
    /// An ID column that is absent, empty, or "." counts as no ID.
    pub(crate) fn read<R: GenotypeRow + ?Sized>(
        row: &'a R,
        columns: &ColumnLayout,
    ) -> Result<Self, PgenError> {
        let id = columns
            .id
            .and_then(|index| row.column(index))
            .filter(|id| !id.is_empty() && *id != ".");
        Ok(Self {
            reference: row.require(columns.reference)?,
            alt: row.require(columns.alt)?,
            id,
            values: row.require(columns.values)?,
        })
    }
}

/// The .pvar path paired with a .pgen path.
pub fn pvar_path(pgen_path: &Path) -> PathBuf {
    pgen_path.with_extension("pvar")
}

/// Writes every row as its own bi-allelic variant into a fixed-width stream.
#[derive(Debug)]
pub struct PgenWriter {
    pgen: PgenOutputStream,
    pvar: PvarWriter,
    factory: RecordFactory,
    columns: ColumnLayout,
}

impl PgenWriter {
    pub fn new(
        pgen: PgenOutputStream,
        pvar: PvarWriter,
        factory: RecordFactory,
        columns: ColumnLayout,
    ) -> Self {
        Self {
            pgen,
            pvar,
            factory,
            columns,
        }
    }

    pub fn write_row<R: GenotypeRow + ?Sized>(&mut self, row: &R) -> Result<(), PgenError> {
        let fields = RowFields::read(row, &self.columns)?;
        let mut record = self.factory.parse(fields.values)?;
        self.pgen.write(&mut record)?;

        let chromosome = row.chromosome();
        let position = row.position();
        match fields.id {
            Some(id) => {
                self.pvar
                    .write(chromosome, position, id, fields.reference, fields.alt)
            }
            None => {
                let id = default_variant_id(chromosome, position, fields.alt, fields.reference);
                self.pvar
                    .write(chromosome, position, &id, fields.reference, fields.alt)
            }
        }
    }

    pub fn close(self) -> Result<Option<PgenSummary>, PgenError> {
        let summary = self.pgen.close()?;
        self.pvar.close()?;
        Ok(summary)
    }
}

/// Either writer, as chosen by `open_writer`.
#[derive(Debug)]
pub enum GenotypeWriter {
    Plain(PgenWriter),
    Grouped(GroupingWriter),
}

impl GenotypeWriter {
    pub fn write_row<R: GenotypeRow + ?Sized>(&mut self, row: &R) -> Result<(), PgenError> {
        match self {
            GenotypeWriter::Plain(writer) => writer.write_row(row),
            GenotypeWriter::Grouped(writer) => writer.write_row(row),
        }
    }

    pub fn close(self) -> Result<Option<PgenSummary>, PgenError> {
        match self {
            GenotypeWriter::Plain(writer) => writer.close(),
            GenotypeWriter::Grouped(writer) => writer.close(),
        }
    }
}

/// Builds the writer a configuration asks for: grouped rows go to a variable-width stream,
/// everything else to the fixed-width mode matching the factory.
pub fn open_writer(config: &WriterConfig, pgen_path: &Path) -> Result<GenotypeWriter, PgenError> {
    config.validate()?;
    let factory = if config.imputed {
        RecordFactory::imputed(config.threshold)?
    } else {
        RecordFactory::hard_calls()
    };
    let pvar = PvarWriter::new(pvar_path(pgen_path));

    if config.group {
        let pgen = PgenOutputStream::variable_in(pgen_path, config.temp_dir.clone());
        info!("Grouping rows into {} output", PgenMode::VariableWidth.name());
        let writer = GroupingWriter::new(pgen, pvar, factory, config.columns)?;
        Ok(GenotypeWriter::Grouped(writer))
    } else {
        let mode = factory.fixed_width_mode();
        info!("Writing rows to {} output", mode.name());
        let pgen = PgenOutputStream::create(pgen_path, mode);
        Ok(GenotypeWriter::Plain(PgenWriter::new(
            pgen,
            pvar,
            factory,
            config.columns,
        )))
    }
}

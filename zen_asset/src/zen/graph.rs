//! Graph data, the load-ordering encoding predating dependency bundles

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;
use crate::zen::exports::{EExportCommandType, ExportBundleHeader};
use crate::zen::package_id::PackageId;

/// Ordering edge between two export bundles of the same package
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FInternalArc {
    /// From (export bundle index)
    pub from: i32,
    /// To (export bundle index)
    pub to: i32,
}

impl FInternalArc {
    /// Read an `FInternalArc` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let from = reader.read_i32::<LE>()?;
        let to = reader.read_i32::<LE>()?;

        Ok(FInternalArc { from, to })
    }

    /// Write an `FInternalArc` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_i32::<LE>(self.from)?;
        writer.write_i32::<LE>(self.to)?;

        Ok(())
    }
}

/// Ordering edge from an imported package's export into a local bundle
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FExternalArc {
    /// From (import index)
    pub from: i32,
    /// From command type
    pub from_command_type: EExportCommandType,
    /// To (export bundle index)
    pub to: i32,
}

impl FExternalArc {
    /// Read an `FExternalArc` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let from = reader.read_i32::<LE>()?;
        let from_command_type = EExportCommandType::try_from(reader.read_u8()? as u32)?;
        let to = reader.read_i32::<LE>()?;

        Ok(FExternalArc {
            from,
            from_command_type,
            to,
        })
    }

    /// Write an `FExternalArc` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_i32::<LE>(self.from)?;
        writer.write_u8(self.from_command_type as u8)?;
        writer.write_i32::<LE>(self.to)?;

        Ok(())
    }
}

/// Graph data section of pre-`NoExportInfo` packages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphData {
    /// Export bundle headers
    pub export_bundle_headers: Vec<ExportBundleHeader>,
    /// Internal arcs
    pub internal_arcs: Vec<FInternalArc>,
    /// External arcs per imported package, in imported-package order
    pub arcs_from_imported_packages: Vec<(PackageId, Vec<FExternalArc>)>,
}

impl GraphData {
    /// Read a `GraphData` from a reader
    ///
    /// The bundle header count and the imported package list come from the
    /// container's store entry, not the package itself.
    pub fn read<R: Read>(
        reader: &mut R,
        export_bundle_headers_count: i32,
        imported_package_ids: &[PackageId],
    ) -> Result<Self, Error> {
        let mut export_bundle_headers =
            Vec::with_capacity(export_bundle_headers_count.max(0) as usize);
        for _ in 0..export_bundle_headers_count {
            export_bundle_headers.push(ExportBundleHeader::read(reader)?);
        }

        let internal_arc_count = reader.read_i32::<LE>()?;
        let mut internal_arcs = Vec::with_capacity(internal_arc_count.max(0) as usize);
        for _ in 0..internal_arc_count {
            internal_arcs.push(FInternalArc::read(reader)?);
        }

        let mut arcs_from_imported_packages = Vec::new();
        for imported_package_id in imported_package_ids {
            let external_arc_count = reader.read_i32::<LE>()?;
            let mut external_arcs = Vec::with_capacity(external_arc_count.max(0) as usize);
            for _ in 0..external_arc_count {
                external_arcs.push(FExternalArc::read(reader)?);
            }
            arcs_from_imported_packages.push((*imported_package_id, external_arcs));
        }

        Ok(GraphData {
            export_bundle_headers,
            internal_arcs,
            arcs_from_imported_packages,
        })
    }

    /// Write a `GraphData` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        for export_bundle_header in &self.export_bundle_headers {
            export_bundle_header.write(writer)?;
        }

        writer.write_i32::<LE>(self.internal_arcs.len() as i32)?;
        for internal_arc in &self.internal_arcs {
            internal_arc.write(writer)?;
        }

        for (_, external_arcs) in &self.arcs_from_imported_packages {
            writer.write_i32::<LE>(external_arcs.len() as i32)?;
            for external_arc in external_arcs {
                external_arc.write(writer)?;
            }
        }

        Ok(())
    }
}

use crate::models::entry::Entry;

use super::format::{self, DEFAULT_DATE_LAYOUT};
use super::template::Value;

/// Typed view of one entry exposed to templates as `.Field` lookups.
///
/// Computed fields are derived on access; the entry itself is never
/// mutated.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    entry: &'a Entry,
    original_key: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn new(entry: &'a Entry, original_key: &'a str) -> Self {
        Self {
            entry,
            original_key,
        }
    }

    pub fn entry(&self) -> &'a Entry {
        self.entry
    }

    pub fn original_key(&self) -> &'a str {
        self.original_key
    }

    /// Size as a template integer, saturating at `i64::MAX`.
    pub fn size(&self) -> i64 {
        i64::try_from(self.entry.size).unwrap_or(i64::MAX)
    }

    /// Resolve a field by name. A leading `Entry.` segment is accepted so
    /// `.Entry.Filename` and `.Filename` are equivalent.
    pub fn field(&self, name: &str) -> Option<Value> {
        let e = self.entry;
        let name = name.strip_prefix("Entry.").unwrap_or(name);
        let value = match name {
            "Id" => Value::Int(e.id),
            "Filename" => Value::Str(e.filename.clone()),
            "ParentPath" => Value::Str(e.parent_path.clone()),
            "FullPath" => Value::Str(e.full_path.clone()),
            "Type" => Value::Int(i64::from(e.entry_type)),
            "Size" => Value::Int(self.size()),
            "Mode" => Value::Str(e.mode.clone()),
            "Uid" => Value::Int(i64::from(e.uid)),
            "Gid" => Value::Int(i64::from(e.gid)),
            "CreateTimeUnix" => Value::Int(e.create_time_unix),
            "ModifyTimeUnix" => Value::Int(e.modify_time_unix),
            "AccessTimeUnix" => Value::Int(e.access_time_unix),
            "Volume" | "VolumeName" => Value::Str(e.volume.clone()),
            "Inode" => Value::Int(i64::try_from(e.inode).unwrap_or(i64::MAX)),
            "TagsExplicitStr" => Value::Str(e.tags_explicit_str.clone()),
            "TagsInheritedStr" => Value::Str(e.tags_inherited_str.clone()),

            "ModifyTimeFormatted" => Value::Str(default_date(e.modify_time_unix)),
            "CreateTimeFormatted" => Value::Str(default_date(e.create_time_unix)),
            "AccessTimeFormatted" => Value::Str(default_date(e.access_time_unix)),
            "SizeFormatted" => Value::Str(format::format_size(self.size(), "auto")),
            "FilenameWithoutExt" => {
                let ext = format::extension(&e.filename);
                Value::Str(e.filename[..e.filename.len() - ext.len()].to_string())
            }
            "Extension" => Value::Str(format::extension(&e.filename)),
            "ParentDir" => Value::Str(format::dir_name(&e.parent_path)),
            "UidString" => Value::Str(e.uid.to_string()),
            "GidString" => Value::Str(e.gid.to_string()),
            "SizeString" => Value::Str(e.size.to_string()),
            "InodeString" => Value::Str(e.inode.to_string()),
            "TagsExplicit" => Value::List(e.tags_explicit()),
            "TagsInherited" => Value::List(e.tags_inherited()),
            "AllTags" => Value::List(e.all_tags()),
            "OriginalKey" => Value::Str(self.original_key.to_string()),
            _ => return None,
        };
        Some(value)
    }
}

fn default_date(secs: i64) -> String {
    format::format_unix(secs, DEFAULT_DATE_LAYOUT).unwrap_or_default()
}

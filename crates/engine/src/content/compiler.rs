use std::collections::{HashMap, HashSet};
use std::fmt;

use roxmltree::{Document, Node};

use super::database::{LevelDatabase, LevelDef};
use super::hashing::sha256_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateLevel,
    EmptyDatabase,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub source_label: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (source={}, line={}, column={})",
                self.code, self.message, self.source_label, loc.line, loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (source={})",
                self.code, self.message, self.source_label
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

const LEVEL_DEF_FIELDS: [&str; 16] = [
    "number",
    "label",
    "litterCooldownTicks",
    "litterSpawnCap",
    "littererMin",
    "littererMax",
    "initialItems",
    "itemMaterials",
    "obstacleKinds",
    "obstacleCount",
    "obstacleMinSpacing",
    "poisonPlants",
    "hasRiver",
    "hasQuests",
    "specialCollectorChance",
    "startsWithDrone",
];

/// Compiles a `<Levels>` document. `source_label` names the origin in errors
/// (a file path or `<builtin>`).
pub fn compile_level_database(
    source_label: &str,
    raw: &str,
) -> Result<LevelDatabase, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        source_label: source_label.to_string(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseContext {
        source_label,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Levels" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Levels>".to_string(),
            root,
        ));
    }

    let mut seen_numbers = HashSet::<u32>::new();
    let mut levels = Vec::<LevelDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "LevelDef" {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <LevelDef> is allowed",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        let level = parse_level_def(&ctx, child)?;
        if !seen_numbers.insert(level.number) {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateLevel,
                format!("duplicate LevelDef number {}", level.number),
                child,
            ));
        }
        levels.push(level);
    }

    if levels.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::EmptyDatabase,
            "<Levels> must contain at least one <LevelDef>".to_string(),
            root,
        ));
    }

    Ok(LevelDatabase::from_levels(levels, sha256_hex(raw.as_bytes())))
}

struct ParseContext<'a, 'input> {
    source_label: &'a str,
    doc: &'a Document<'input>,
}

impl ParseContext<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            source_label: self.source_label.to_string(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

struct LevelFields<'a, 'input> {
    owner: Node<'a, 'input>,
    by_name: HashMap<&'a str, Node<'a, 'input>>,
}

impl<'a, 'input> LevelFields<'a, 'input> {
    fn node(
        &self,
        ctx: &ParseContext<'_, '_>,
        name: &str,
    ) -> Result<Node<'a, 'input>, ContentCompileError> {
        self.by_name.get(name).copied().ok_or_else(|| {
            ctx.error_at(
                ContentErrorCode::MissingField,
                format!("missing required field <{name}> in <LevelDef>"),
                self.owner,
            )
        })
    }

    fn text(
        &self,
        ctx: &ParseContext<'_, '_>,
        name: &str,
    ) -> Result<(Node<'a, 'input>, String), ContentCompileError> {
        let node = self.node(ctx, name)?;
        Ok((node, required_text(ctx, node, name)?))
    }

    fn u32(&self, ctx: &ParseContext<'_, '_>, name: &str) -> Result<u32, ContentCompileError> {
        let (node, value) = self.text(ctx, name)?;
        value.parse::<u32>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} '{value}' is not a non-negative integer"),
                node,
            )
        })
    }

    fn f32(&self, ctx: &ParseContext<'_, '_>, name: &str) -> Result<f32, ContentCompileError> {
        let (node, value) = self.text(ctx, name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} '{value}' is not a valid number"),
                node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} must be finite and >= 0"),
                node,
            ));
        }
        Ok(parsed)
    }

    fn optional_f32(
        &self,
        ctx: &ParseContext<'_, '_>,
        name: &str,
    ) -> Result<Option<f32>, ContentCompileError> {
        if self.by_name.contains_key(name) {
            self.f32(ctx, name).map(Some)
        } else {
            Ok(None)
        }
    }

    fn bool(&self, ctx: &ParseContext<'_, '_>, name: &str) -> Result<bool, ContentCompileError> {
        let (node, value) = self.text(ctx, name)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} '{value}' must be true or false"),
                node,
            )),
        }
    }

    /// Comma-separated tokens. An empty element yields an empty list.
    fn list(
        &self,
        ctx: &ParseContext<'_, '_>,
        name: &str,
    ) -> Result<Vec<String>, ContentCompileError> {
        let node = self.node(ctx, name)?;
        let raw = node.text().map(str::trim).unwrap_or_default();
        let mut tokens = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            if !token
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(ctx.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("{name} entry '{token}' must be a lowercase snake_case token"),
                    node,
                ));
            }
            tokens.push(token.to_string());
        }
        Ok(tokens)
    }
}

fn parse_level_def(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<LevelDef, ContentCompileError> {
    let mut by_name = HashMap::new();
    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        if !LEVEL_DEF_FIELDS.contains(&field_name) {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!("unknown field <{field_name}> in <LevelDef>"),
                field,
            ));
        }
        if by_name.insert(field_name, field).is_some() {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <LevelDef>"),
                field,
            ));
        }
    }
    let fields = LevelFields {
        owner: node,
        by_name,
    };

    let number = fields.u32(ctx, "number")?;
    if number == 0 {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            "number must be >= 1".to_string(),
            fields.node(ctx, "number")?,
        ));
    }

    let litter_cooldown_ticks = fields.u32(ctx, "litterCooldownTicks")?;
    if litter_cooldown_ticks == 0 {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            "litterCooldownTicks must be >= 1".to_string(),
            fields.node(ctx, "litterCooldownTicks")?,
        ));
    }

    let litterer_min = fields.u32(ctx, "littererMin")?;
    let litterer_max = fields.u32(ctx, "littererMax")?;
    if litterer_min > litterer_max {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            format!("littererMin {litterer_min} exceeds littererMax {litterer_max}"),
            fields.node(ctx, "littererMin")?,
        ));
    }

    let item_materials = fields.list(ctx, "itemMaterials")?;
    if item_materials.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            "itemMaterials must list at least one material".to_string(),
            fields.node(ctx, "itemMaterials")?,
        ));
    }

    let obstacle_kinds = fields.list(ctx, "obstacleKinds")?;
    let obstacle_count = fields.u32(ctx, "obstacleCount")?;
    if obstacle_count > 0 && obstacle_kinds.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            "obstacleKinds must not be empty when obstacleCount > 0".to_string(),
            fields.node(ctx, "obstacleKinds")?,
        ));
    }

    let special_collector_chance = fields.f32(ctx, "specialCollectorChance")?;
    if special_collector_chance > 1.0 {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            "specialCollectorChance must be within 0..=1".to_string(),
            fields.node(ctx, "specialCollectorChance")?,
        ));
    }

    Ok(LevelDef {
        number,
        label: fields.text(ctx, "label")?.1,
        litter_cooldown_ticks,
        litter_spawn_cap: fields.u32(ctx, "litterSpawnCap")?,
        litterer_min,
        litterer_max,
        initial_items: fields.u32(ctx, "initialItems")?,
        item_materials,
        obstacle_kinds,
        obstacle_count,
        obstacle_min_spacing: fields.optional_f32(ctx, "obstacleMinSpacing")?,
        poison_plants: fields.u32(ctx, "poisonPlants")?,
        has_river: fields.bool(ctx, "hasRiver")?,
        has_quests: fields.bool(ctx, "hasQuests")?,
        special_collector_chance,
        starts_with_drone: fields.bool(ctx, "startsWithDrone")?,
    })
}

fn required_text(
    ctx: &ParseContext<'_, '_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            node,
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_xml(number: u32, extra: &str) -> String {
        format!(
            r#"<LevelDef>
                <number>{number}</number>
                <label>Forest</label>
                <litterCooldownTicks>1200</litterCooldownTicks>
                <litterSpawnCap>10</litterSpawnCap>
                <littererMin>3</littererMin>
                <littererMax>5</littererMax>
                <initialItems>15</initialItems>
                <itemMaterials>plastic, paper,bottle</itemMaterials>
                <obstacleKinds>tree,tree_big</obstacleKinds>
                <obstacleCount>40</obstacleCount>
                <poisonPlants>10</poisonPlants>
                <hasRiver>true</hasRiver>
                <hasQuests>true</hasQuests>
                <specialCollectorChance>0</specialCollectorChance>
                <startsWithDrone>false</startsWithDrone>
                {extra}
            </LevelDef>"#
        )
    }

    fn levels_xml(body: &str) -> String {
        format!("<Levels>{body}</Levels>")
    }

    #[test]
    fn valid_compile_sorts_levels_by_number() {
        let spaced = level_xml(1, "<obstacleMinSpacing>80</obstacleMinSpacing>");
        let raw = levels_xml(&(level_xml(2, "") + &spaced));
        let db = compile_level_database("<test>", &raw).expect("compile");

        assert_eq!(db.level_count(), 2);
        assert_eq!(db.first_level().map(|level| level.number), Some(1));
        let first = db.level(1).expect("level 1");
        assert_eq!(first.item_materials, vec!["plastic", "paper", "bottle"]);
        assert_eq!(first.obstacle_min_spacing, Some(80.0));
        assert_eq!(db.level(2).and_then(|level| level.obstacle_min_spacing), None);
        assert_eq!(db.next_level_after(1).map(|level| level.number), Some(2));
        assert!(db.next_level_after(2).is_none());
        assert_eq!(db.fingerprint(), sha256_hex(raw.as_bytes()));
    }

    #[test]
    fn missing_field_reports_location() {
        let raw = levels_xml("<LevelDef><number>1</number></LevelDef>");
        let err = compile_level_database("levels.xml", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert_eq!(err.source_label, "levels.xml");
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_field_errors() {
        let raw = levels_xml(&level_xml(1, "<weather>rain</weather>"));
        let err = compile_level_database("<test>", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn duplicate_field_errors() {
        let raw = levels_xml(&level_xml(1, "<hasRiver>false</hasRiver>"));
        let err = compile_level_database("<test>", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn duplicate_level_number_errors() {
        let raw = levels_xml(&(level_xml(1, "") + &level_xml(1, "")));
        let err = compile_level_database("<test>", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateLevel);
    }

    #[test]
    fn invalid_bool_errors() {
        let raw = levels_xml(&level_xml(1, "").replace(
            "<hasQuests>true</hasQuests>",
            "<hasQuests>yes</hasQuests>",
        ));
        let err = compile_level_database("<test>", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn inverted_litterer_range_errors() {
        let raw = levels_xml(&level_xml(1, "").replace(
            "<littererMin>3</littererMin>",
            "<littererMin>9</littererMin>",
        ));
        let err = compile_level_database("<test>", &raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err =
            compile_level_database("<test>", "<Levels><LevelDef></Levels>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn wrong_root_and_empty_database_error() {
        let err = compile_level_database("<test>", "<Defs/>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
        let err = compile_level_database("<test>", "<Levels/>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::EmptyDatabase);
    }

    #[test]
    fn unknown_def_type_errors() {
        let err =
            compile_level_database("<test>", "<Levels><EntityDef/></Levels>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownDefType);
    }
}

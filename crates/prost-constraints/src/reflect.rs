//! Adapter from `prost-reflect` descriptors and dynamic messages to the
//! host-independent [`Schema`] and [`Value`] models.
//!
//! Options are read from extensions of `google.protobuf.FieldOptions` and
//! `google.protobuf.MessageOptions`. Any package may declare them; only the
//! extension's short name is matched against [`CATALOGUE`].

use prost_reflect::{
    DescriptorPool, DynamicMessage, Kind, MapKey, MessageDescriptor, ReflectMessage, Value as ReflectValue,
};

use crate::error::RuntimeError;
use crate::options::{CATALOGUE, DiscoveredOption};
use crate::schema::{Cardinality, FieldKind, PrimitiveKind, RecordKind, Schema, TypeDescriptor};
use crate::value::{MessageValue, Value};

/// Message option marking a type as an entity.
const ENTITY_OPTION: &str = "entity";

/// Build a [`Schema`] holding every message type of `pool`.
///
/// Synthetic map entry types are folded into their map fields.
#[must_use]
pub fn schema_from_pool(pool: &DescriptorPool) -> Schema {
    let mut schema = Schema::new();
    for message in pool.all_messages().filter(|m| !m.is_map_entry()) {
        schema.insert(type_descriptor(&message));
    }
    schema
}

/// Convert one message descriptor, keeping fields in declaration order.
#[must_use]
pub fn type_descriptor(message: &MessageDescriptor) -> TypeDescriptor {
    let mut descriptor = TypeDescriptor::new(message.full_name()).with_kind(record_kind(message));
    for field in message.fields() {
        let kind = field.kind();
        descriptor = if field.is_map() {
            let Some(entry) = kind.as_message() else {
                continue;
            };
            let key = field_kind(&entry.map_entry_key_field().kind())
                .as_primitive()
                .unwrap_or(PrimitiveKind::String);
            descriptor.field(
                field.name(),
                Cardinality::Map { key },
                field_kind(&entry.map_entry_value_field().kind()),
            )
        } else if field.is_list() {
            descriptor.field(field.name(), Cardinality::List, field_kind(&kind))
        } else {
            descriptor.field(field.name(), Cardinality::Singular, field_kind(&kind))
        };
    }
    descriptor
}

fn record_kind(message: &MessageDescriptor) -> RecordKind {
    let options = message.options();
    let entity = options.extensions().any(|(extension, value)| {
        extension.name() == ENTITY_OPTION
            && (value.as_bool() == Some(true) || value.as_message().is_some())
    });
    if entity {
        return RecordKind::Entity;
    }

    let file = message.parent_file();
    let file_name = file.name();
    if file_name.ends_with("commands.proto") {
        RecordKind::Command
    } else if file_name.ends_with("events.proto") {
        RecordKind::Event
    } else if file_name.ends_with("rejections.proto") {
        RecordKind::Rejection
    } else {
        RecordKind::Plain
    }
}

fn field_kind(kind: &Kind) -> FieldKind {
    let primitive = match kind {
        Kind::Double => PrimitiveKind::Double,
        Kind::Float => PrimitiveKind::Float,
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => PrimitiveKind::Int32,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => PrimitiveKind::Int64,
        Kind::Uint32 | Kind::Fixed32 => PrimitiveKind::UInt32,
        Kind::Uint64 | Kind::Fixed64 => PrimitiveKind::UInt64,
        Kind::Bool => PrimitiveKind::Bool,
        Kind::String => PrimitiveKind::String,
        Kind::Bytes => PrimitiveKind::Bytes,
        Kind::Message(message) => return FieldKind::message(message.full_name()),
        Kind::Enum(enumeration) => return FieldKind::enumeration(enumeration.full_name()),
    };
    FieldKind::Primitive(primitive)
}

/// Collect every catalogued option declared on the types of `pool`.
///
/// Options come out in type order, message-level options of a type before
/// those of its fields.
#[must_use]
pub fn discover_options(pool: &DescriptorPool) -> Vec<DiscoveredOption> {
    let mut discovered = Vec::new();
    for message in pool.all_messages().filter(|m| !m.is_map_entry()) {
        let type_name = message.full_name();
        let options = message.options();
        for (extension, value) in options.extensions() {
            if CATALOGUE.contains(&extension.name()) {
                discovered.push(DiscoveredOption::message(
                    type_name,
                    extension.name(),
                    convert(&extension.kind(), value),
                ));
            }
        }

        for field in message.fields() {
            let options = field.options();
            for (extension, value) in options.extensions() {
                if CATALOGUE.contains(&extension.name()) {
                    discovered.push(DiscoveredOption::field(
                        type_name,
                        field.name(),
                        extension.name(),
                        convert(&extension.kind(), value),
                    ));
                }
            }
        }
    }
    discovered
}

/// Convert a dynamic message into a [`MessageValue`].
///
/// Only fields that are set are copied; unset fields read as their default.
#[must_use]
pub fn value_from_message(message: &DynamicMessage) -> MessageValue {
    let descriptor = message.descriptor();
    let mut record = MessageValue::new(descriptor.full_name());
    for (field, value) in message.fields() {
        record.set(field.name(), convert(&field.kind(), value));
    }
    record
}

/// Decode `bytes` as a `descriptor` message and convert it.
///
/// # Errors
///
/// Returns a [`RuntimeError`] if the bytes are not a valid encoding.
pub fn value_from_bytes(descriptor: MessageDescriptor, bytes: &[u8]) -> Result<MessageValue, RuntimeError> {
    let message = DynamicMessage::decode(descriptor, bytes)?;
    Ok(value_from_message(&message))
}

/// `kind` is the element kind for lists and the entry type for maps.
fn convert(kind: &Kind, value: &ReflectValue) -> Value {
    match value {
        ReflectValue::Bool(b) => Value::Bool(*b),
        ReflectValue::I32(n) => Value::Int(i64::from(*n)),
        ReflectValue::I64(n) => Value::Int(*n),
        ReflectValue::U32(n) => Value::UInt(u64::from(*n)),
        ReflectValue::U64(n) => Value::UInt(*n),
        ReflectValue::F32(n) => Value::Double(f64::from(*n)),
        ReflectValue::F64(n) => Value::Double(*n),
        ReflectValue::String(s) => Value::String(s.clone()),
        ReflectValue::Bytes(b) => Value::Bytes(b.to_vec()),
        ReflectValue::EnumNumber(number) => match kind.as_enum() {
            Some(enumeration) => Value::enumeration(enumeration.full_name(), *number),
            None => Value::Int(i64::from(*number)),
        },
        ReflectValue::Message(message) => Value::Message(value_from_message(message)),
        ReflectValue::List(items) => Value::List(items.iter().map(|item| convert(kind, item)).collect()),
        ReflectValue::Map(entries) => {
            let value_kind = kind
                .as_message()
                .map_or_else(|| kind.clone(), |entry| entry.map_entry_value_field().kind());
            Value::map(
                entries
                    .iter()
                    .map(|(key, value)| (map_key(key), convert(&value_kind, value)))
                    .collect(),
            )
        }
    }
}

fn map_key(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(b) => Value::Bool(*b),
        MapKey::I32(n) => Value::Int(i64::from(*n)),
        MapKey::I64(n) => Value::Int(*n),
        MapKey::U32(n) => Value::UInt(u64::from(*n)),
        MapKey::U64(n) => Value::UInt(*n),
        MapKey::String(s) => Value::String(s.clone()),
    }
}

/// A descriptor pool with catalogued options, assembled from
/// `FileDescriptorProto`s the way `protoc` would emit them.
#[cfg(test)]
pub(crate) mod fixture {
    use prost::Message;
    use prost_reflect::{DescriptorPool, DynamicMessage, Value as ReflectValue};
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MessageOptions};

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            ..FieldDescriptorProto::default()
        }
    }

    fn typed(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            type_name: Some(type_name.to_string()),
            ..field(name, number, ty)
        }
    }

    fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
        FieldDescriptorProto {
            label: Some(Label::Repeated as i32),
            ..field
        }
    }

    fn extension(extendee: &str, field: FieldDescriptorProto) -> FieldDescriptorProto {
        FieldDescriptorProto {
            extendee: Some(extendee.to_string()),
            ..field
        }
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..DescriptorProto::default()
        }
    }

    fn options_file() -> FileDescriptorProto {
        const FIELD_OPTIONS: &str = ".google.protobuf.FieldOptions";
        const MESSAGE_OPTIONS: &str = ".google.protobuf.MessageOptions";
        FileDescriptorProto {
            name: Some("acme/options.proto".to_string()),
            package: Some("acme.options".to_string()),
            dependency: vec!["google/protobuf/descriptor.proto".to_string()],
            syntax: Some("proto3".to_string()),
            enum_type: vec![prost_types::EnumDescriptorProto {
                name: Some("Time".to_string()),
                value: ["TIME_UNDEFINED", "PAST", "FUTURE"]
                    .iter()
                    .zip(0..)
                    .map(|(name, number)| prost_types::EnumValueDescriptorProto {
                        name: Some((*name).to_string()),
                        number: Some(number),
                        ..prost_types::EnumValueDescriptorProto::default()
                    })
                    .collect(),
                ..prost_types::EnumDescriptorProto::default()
            }],
            message_type: vec![
                message(
                    "BoundOption",
                    vec![
                        field("value", 1, Type::String),
                        field("exclusive", 2, Type::Bool),
                        field("error_msg", 3, Type::String),
                    ],
                ),
                message(
                    "WhenOption",
                    vec![
                        typed("in", 1, Type::Enum, ".acme.options.Time"),
                        field("error_msg", 2, Type::String),
                    ],
                ),
                message(
                    "GoesOption",
                    vec![field("with", 1, Type::String), field("error_msg", 2, Type::String)],
                ),
            ],
            extension: vec![
                extension(FIELD_OPTIONS, field("required", 73812, Type::Bool)),
                extension(FIELD_OPTIONS, field("if_missing", 73813, Type::String)),
                extension(FIELD_OPTIONS, field("range", 73814, Type::String)),
                extension(FIELD_OPTIONS, typed("min", 73815, Type::Message, ".acme.options.BoundOption")),
                extension(FIELD_OPTIONS, typed("max", 73816, Type::Message, ".acme.options.BoundOption")),
                extension(FIELD_OPTIONS, field("pattern", 73817, Type::String)),
                extension(FIELD_OPTIONS, field("distinct", 73818, Type::Bool)),
                extension(FIELD_OPTIONS, field("validate", 73819, Type::Bool)),
                extension(FIELD_OPTIONS, typed("when", 73820, Type::Message, ".acme.options.WhenOption")),
                extension(FIELD_OPTIONS, typed("goes", 73821, Type::Message, ".acme.options.GoesOption")),
                extension(FIELD_OPTIONS, field("set_once", 73822, Type::Bool)),
                extension(FIELD_OPTIONS, field("column", 73823, Type::Int32)),
                extension(MESSAGE_OPTIONS, field("required_field", 73901, Type::String)),
                extension(MESSAGE_OPTIONS, field("entity", 73902, Type::Bool)),
            ],
            ..FileDescriptorProto::default()
        }
    }

    // Field numbers below are referenced by index in `annotate_users`.
    fn users_file() -> FileDescriptorProto {
        let labels_entry = DescriptorProto {
            name: Some("LabelsEntry".to_string()),
            field: vec![field("key", 1, Type::String), field("value", 2, Type::String)],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..MessageOptions::default()
            }),
            ..DescriptorProto::default()
        };
        let user = DescriptorProto {
            nested_type: vec![labels_entry],
            ..message(
                "User",
                vec![
                    field("id", 1, Type::String),
                    field("age", 2, Type::Int32),
                    typed("address", 3, Type::Message, ".acme.Address"),
                    repeated(field("emails", 4, Type::String)),
                    typed("born", 5, Type::Message, ".google.protobuf.Timestamp"),
                    field("nickname", 6, Type::String),
                    field("login", 7, Type::String),
                    repeated(typed("labels", 8, Type::Message, ".acme.User.LabelsEntry")),
                    field("score", 9, Type::Double),
                ],
            )
        };
        FileDescriptorProto {
            name: Some("acme/users.proto".to_string()),
            package: Some("acme".to_string()),
            dependency: vec![
                "google/protobuf/timestamp.proto".to_string(),
                "acme/options.proto".to_string(),
            ],
            syntax: Some("proto3".to_string()),
            message_type: vec![
                message(
                    "Address",
                    vec![
                        field("first_line", 1, Type::String),
                        field("town", 2, Type::String),
                        field("number", 3, Type::Int32),
                    ],
                ),
                user,
                message(
                    "Account",
                    vec![field("uuid", 1, Type::String), field("balance", 2, Type::Int64)],
                ),
            ],
            ..FileDescriptorProto::default()
        }
    }

    fn events_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("acme/events.proto".to_string()),
            package: Some("acme".to_string()),
            dependency: vec!["acme/users.proto".to_string()],
            syntax: Some("proto3".to_string()),
            message_type: vec![message(
                "UserRegistered",
                vec![
                    field("user_id", 1, Type::String),
                    typed("user", 2, Type::Message, ".acme.User"),
                ],
            )],
            ..FileDescriptorProto::default()
        }
    }

    fn list_item(list: &mut ReflectValue, index: usize) -> &mut DynamicMessage {
        list.as_list_mut()
            .and_then(|items| items.get_mut(index))
            .and_then(ReflectValue::as_message_mut)
            .expect("descriptor list entry")
    }

    fn options_of(descriptor: &mut DynamicMessage) -> &mut DynamicMessage {
        descriptor
            .get_field_by_name_mut("options")
            .and_then(ReflectValue::as_message_mut)
            .expect("options field")
    }

    struct Annotator<'a> {
        pool: &'a DescriptorPool,
        file: DynamicMessage,
    }

    impl Annotator<'_> {
        fn message_option(&mut self, message: usize, name: &str, value: ReflectValue) {
            let extension = self.extension(name);
            let types = self.file.get_field_by_name_mut("message_type").expect("message_type");
            options_of(list_item(types, message)).set_extension(&extension, value);
        }

        fn field_option(&mut self, message: usize, field: usize, name: &str, value: ReflectValue) {
            let extension = self.extension(name);
            let types = self.file.get_field_by_name_mut("message_type").expect("message_type");
            let fields = list_item(types, message).get_field_by_name_mut("field").expect("field");
            options_of(list_item(fields, field)).set_extension(&extension, value);
        }

        fn structured(&self, type_name: &str, fields: &[(&str, ReflectValue)]) -> ReflectValue {
            let descriptor = self.pool.get_message_by_name(type_name).expect("option message");
            let mut message = DynamicMessage::new(descriptor);
            for (name, value) in fields {
                message.set_field_by_name(name, value.clone());
            }
            ReflectValue::Message(message)
        }

        fn extension(&self, name: &str) -> prost_reflect::ExtensionDescriptor {
            self.pool
                .get_extension_by_name(&format!("acme.options.{name}"))
                .expect("extension is declared")
        }
    }

    fn text(s: &str) -> ReflectValue {
        ReflectValue::String(s.to_string())
    }

    fn annotate_users(a: &mut Annotator<'_>) {
        // acme.Address
        a.field_option(0, 0, "required", ReflectValue::Bool(true));
        a.field_option(0, 1, "required", ReflectValue::Bool(true));
        a.field_option(0, 1, "if_missing", text("A town is needed."));
        // acme.User
        a.message_option(1, "required_field", text("id | login"));
        a.field_option(1, 1, "range", text("[0..150]"));
        a.field_option(1, 2, "validate", ReflectValue::Bool(true));
        a.field_option(1, 3, "distinct", ReflectValue::Bool(true));
        a.field_option(1, 3, "pattern", text("[^@]+@[^@]+"));
        let when = a.structured("acme.options.WhenOption", &[("in", ReflectValue::EnumNumber(1))]);
        a.field_option(1, 4, "when", when);
        let goes = a.structured("acme.options.GoesOption", &[("with", text("address"))]);
        a.field_option(1, 5, "goes", goes);
        a.field_option(1, 6, "column", ReflectValue::I32(3));
        let min = a.structured(
            "acme.options.BoundOption",
            &[("value", text("0")), ("exclusive", ReflectValue::Bool(true))],
        );
        a.field_option(1, 8, "min", min);
        // acme.Account
        a.message_option(2, "entity", ReflectValue::Bool(true));
        a.field_option(2, 1, "set_once", ReflectValue::Bool(true));
    }

    /// Pool holding `acme/options.proto`, `acme/users.proto` and
    /// `acme/events.proto` on top of the well-known types.
    pub(crate) fn pool() -> DescriptorPool {
        let mut pool = DescriptorPool::global();
        pool.add_file_descriptor_proto(options_file()).expect("options file is valid");

        let file_type = pool
            .get_message_by_name("google.protobuf.FileDescriptorProto")
            .expect("descriptor.proto is available");
        let file = DynamicMessage::decode(file_type, users_file().encode_to_vec().as_slice())
            .expect("users file decodes");
        let annotated = {
            let mut annotator = Annotator { pool: &pool, file };
            annotate_users(&mut annotator);
            annotator.file.encode_to_vec()
        };

        pool.decode_file_descriptor_proto(annotated.as_slice())
            .expect("annotated users file is valid");
        pool.add_file_descriptor_proto(events_file()).expect("events file is valid");
        pool
    }
}

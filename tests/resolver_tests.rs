//! End-to-end coverage of the conversion strategy chain.

use std::sync::Arc;

use coercion::type_hash::builtin;
use coercion::{
    ConvDirection, ConvFn, ConversionError, ConversionOp, Converter, ConverterRegistry, Format,
    Resolver, TypeDef, TypeHash, TypeKind, TypeRegistry, Value,
};

fn reference_class(name: &str, base: Option<TypeHash>) -> TypeDef {
    TypeDef::Class {
        name: name.to_string(),
        base_class: base,
        interfaces: Vec::new(),
        type_kind: TypeKind::Reference,
        conversion_ops: Vec::new(),
        default_converter: None,
    }
}

fn build_mode(types: &mut TypeRegistry) -> TypeHash {
    let mode = TypeHash::from_name("BuildMode");
    types
        .register(
            mode,
            TypeDef::Enum {
                name: "BuildMode".into(),
                variants: vec![("Debug".into(), 1), ("Release".into(), 2)],
            },
        )
        .unwrap();
    mode
}

#[test]
fn primitive_round_trips() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let rendered = resolver.convert(&Value::Int32(1234), builtin::STRING).unwrap();
    assert_eq!(rendered, Value::String("1234".into()));
    let parsed = resolver.convert(&rendered, builtin::INT32).unwrap();
    assert_eq!(parsed, Value::Int32(1234));

    let rendered = resolver.convert(&Value::Bool(true), builtin::STRING).unwrap();
    assert_eq!(rendered, Value::String("true".into()));
    let parsed = resolver.convert(&rendered, builtin::BOOL).unwrap();
    assert_eq!(parsed.as_bool(), Some(true));
}

#[test]
fn null_into_unregistered_target_passes_through() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    // A hash with no descriptor carries no flags and reads as
    // reference-like, so absence flows through
    let unknown = TypeHash::from_name("NeverRegistered");
    assert_eq!(resolver.convert(&Value::Null, unknown).unwrap(), Value::Null);

    let (ok, _) = resolver.try_convert(&Value::Int32(1), unknown);
    assert!(!ok);
}

#[test]
fn guid_string_round_trip() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let text = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let guid = resolver.convert(&Value::String(text.into()), builtin::GUID).unwrap();
    let back = resolver.convert(&guid, builtin::STRING).unwrap();
    assert_eq!(back, Value::String(text.into()));
}

#[test]
fn null_to_value_type_raises() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let err = resolver.convert(&Value::Null, builtin::INT32).unwrap_err();
    assert_eq!(err, ConversionError::NullToValueType { target: builtin::INT32 });

    let err = resolver.convert(&Value::DbNull, builtin::GUID).unwrap_err();
    assert!(matches!(err, ConversionError::NullToValueType { .. }));
}

#[test]
fn null_flows_into_nullable_and_reference_targets() {
    let mut types = TypeRegistry::new();
    let nullable_int = TypeHash::from_name("nullable<int>");
    types
        .register(nullable_int, TypeDef::Nullable { underlying: builtin::INT32 })
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    assert_eq!(resolver.convert(&Value::Null, nullable_int).unwrap(), Value::Null);
    assert_eq!(resolver.convert(&Value::DbNull, nullable_int).unwrap(), Value::DbNull);
    assert_eq!(resolver.convert(&Value::Null, builtin::STRING).unwrap(), Value::Null);
}

#[test]
fn nullable_target_converts_present_values_to_underlying() {
    let mut types = TypeRegistry::new();
    let nullable_int = TypeHash::from_name("nullable<int>");
    types
        .register(nullable_int, TypeDef::Nullable { underlying: builtin::INT32 })
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    assert_eq!(
        resolver.convert(&Value::Int32(5), nullable_int).unwrap(),
        Value::Int32(5)
    );
    assert_eq!(
        resolver.convert(&Value::String("6".into()), nullable_int).unwrap(),
        Value::Int32(6)
    );
}

#[test]
fn template_targets_are_invalid() {
    let mut types = TypeRegistry::new();
    let list = TypeHash::from_name("list");
    types
        .register(list, TypeDef::Template { name: "list".into(), param_count: 1 })
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let err = resolver.convert(&Value::Int32(1), list).unwrap_err();
    assert_eq!(err, ConversionError::InvalidTarget { target: list, name: "list".into() });

    // A bound instance is an ordinary type
    let list_int = TypeHash::from_template_instance(list, &[builtin::INT32]);
    types.register(list_int, reference_class("list<int>", None)).unwrap();
    let resolver = Resolver::new(&types, &converters);
    let instance = Value::Object { type_hash: list_int, data: Arc::new(()) };
    assert!(resolver.convert(&instance, list_int).is_ok());
}

#[test]
fn empty_target_is_rejected() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let err = resolver.convert(&Value::Int32(1), TypeHash::EMPTY).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidArgument { .. }));
}

#[test]
fn upcast_hands_back_the_same_instance() {
    let mut types = TypeRegistry::new();
    let base = TypeHash::from_name("Shape");
    let sub = TypeHash::from_name("Circle");
    types.register(base, reference_class("Shape", None)).unwrap();
    types.register(sub, reference_class("Circle", Some(base))).unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let data: Arc<dyn std::any::Any + Send + Sync> = Arc::new(3u8);
    let circle = Value::Object { type_hash: sub, data: Arc::clone(&data) };

    let as_shape = resolver.convert(&circle, base).unwrap();
    // Same instance, no copy: pointer identity holds
    assert_eq!(as_shape, circle);
}

#[test]
fn downcast_follows_the_runtime_type() {
    let mut types = TypeRegistry::new();
    let base = TypeHash::from_name("Shape");
    let sub = TypeHash::from_name("Circle");
    types.register(base, reference_class("Shape", None)).unwrap();
    types.register(sub, reference_class("Circle", Some(base))).unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    // A base-typed variable holding a Circle still carries the Circle
    // runtime hash, so requesting Circle succeeds
    let circle = Value::Object { type_hash: sub, data: Arc::new(()) };
    assert!(resolver.convert(&circle, sub).is_ok());

    // An actual Shape instance cannot become a Circle
    let shape = Value::Object { type_hash: base, data: Arc::new(()) };
    let err = resolver.convert(&shape, sub).unwrap_err();
    assert_eq!(err, ConversionError::UnsupportedConversion { from: base, to: sub });
}

#[test]
fn interface_assignability() {
    let mut types = TypeRegistry::new();
    let drawable = TypeHash::from_name("Drawable");
    let shape = TypeHash::from_name("Shape");
    types.register(drawable, TypeDef::Interface { name: "Drawable".into() }).unwrap();
    types
        .register(
            shape,
            TypeDef::Class {
                name: "Shape".into(),
                base_class: None,
                interfaces: vec![drawable],
                type_kind: TypeKind::Reference,
                conversion_ops: Vec::new(),
                default_converter: None,
            },
        )
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let instance = Value::Object { type_hash: shape, data: Arc::new(()) };
    let as_drawable = resolver.convert(&instance, drawable).unwrap();
    assert_eq!(as_drawable, instance);
}

#[test]
fn enum_fallback_all_forms() {
    let mut types = TypeRegistry::new();
    let mode = build_mode(&mut types);
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    // number -> enum
    let out = resolver.convert(&Value::Int32(1), mode).unwrap();
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 1 });

    // name -> enum, case-insensitive
    let out = resolver.convert(&Value::String("Release".into()), mode).unwrap();
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 2 });
    let out = resolver.convert(&Value::String("debug".into()), mode).unwrap();
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 1 });

    // numeric string -> enum, tried after the name
    let out = resolver.convert(&Value::String("2".into()), mode).unwrap();
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 2 });

    // undeclared values stay unsupported
    let err = resolver.convert(&Value::Int32(9), mode).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
    let err = resolver.convert(&Value::String("Profile".into()), mode).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
}

#[test]
fn enum_source_converts_to_number_and_name() {
    let mut types = TypeRegistry::new();
    let mode = build_mode(&mut types);
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let debug = Value::Enum { type_hash: mode, discriminant: 1 };
    assert_eq!(resolver.convert(&debug, builtin::INT32).unwrap(), Value::Int32(1));
    assert_eq!(
        resolver.convert(&debug, builtin::STRING).unwrap(),
        Value::String("Debug".into())
    );
}

struct StringWrapper;

impl Converter for StringWrapper {
    fn convert_from(
        &self,
        value: &Value,
        _types: &TypeRegistry,
        _format: &Format,
    ) -> anyhow::Result<Option<Value>> {
        Ok(value.as_i64().map(|v| Value::String(format!("<{}>", v))))
    }

    fn convert_to(
        &self,
        value: &Value,
        target: TypeHash,
        _types: &TypeRegistry,
        _format: &Format,
    ) -> anyhow::Result<Option<Value>> {
        if target != builtin::INT32 {
            return Ok(None);
        }
        let trimmed = match value.as_str() {
            Some(s) => s.trim_start_matches('<').trim_end_matches('>'),
            None => return Ok(None),
        };
        Ok(trimmed.parse::<i32>().ok().map(Value::Int32))
    }
}

#[test]
fn registered_converter_outranks_builtin_matrix() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    converters.register(builtin::STRING, Arc::new(StringWrapper)).unwrap();
    let resolver = Resolver::new(&types, &converters);

    // convert_from on the target's capability
    let out = resolver.convert(&Value::Int32(7), builtin::STRING).unwrap();
    assert_eq!(out, Value::String("<7>".into()));

    // convert_to on the source's capability
    let out = resolver.convert(&Value::String("<9>".into()), builtin::INT32).unwrap();
    assert_eq!(out, Value::Int32(9));
}

#[test]
fn declining_converter_falls_through_to_builtin() {
    struct Declines;
    impl Converter for Declines {
        fn convert_from(
            &self,
            _value: &Value,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
        fn convert_to(
            &self,
            _value: &Value,
            _target: TypeHash,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
    }

    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    converters.register(builtin::INT32, Arc::new(Declines)).unwrap();
    let resolver = Resolver::new(&types, &converters);

    let out = resolver.convert(&Value::String("31".into()), builtin::INT32).unwrap();
    assert_eq!(out, Value::Int32(31));
}

#[test]
fn default_converter_on_type_definition() {
    struct FromAnything;
    impl Converter for FromAnything {
        fn convert_from(
            &self,
            value: &Value,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            Ok(Some(Value::String(format!("wrapped:{}", value))))
        }
        fn convert_to(
            &self,
            _value: &Value,
            _target: TypeHash,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
        fn can_convert_from(&self, _source: TypeHash, _types: &TypeRegistry) -> bool {
            true
        }
    }

    let mut types = TypeRegistry::new();
    let wrapper = TypeHash::from_name("Wrapper");
    types
        .register(
            wrapper,
            TypeDef::Class {
                name: "Wrapper".into(),
                base_class: None,
                interfaces: Vec::new(),
                type_kind: TypeKind::Reference,
                conversion_ops: Vec::new(),
                default_converter: Some(Arc::new(FromAnything)),
            },
        )
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let out = resolver.convert(&Value::Int32(3), wrapper).unwrap();
    assert_eq!(out, Value::String("wrapped:3".into()));
}

#[test]
fn undeclaring_default_converter_is_skipped() {
    struct NeverAsked;
    impl Converter for NeverAsked {
        fn convert_from(
            &self,
            _value: &Value,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            panic!("capability invoked without a can_convert_from declaration");
        }
        fn convert_to(
            &self,
            _value: &Value,
            _target: TypeHash,
            _types: &TypeRegistry,
            _format: &Format,
        ) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
        // can_convert_from stays at the default (declines everything)
    }

    let mut types = TypeRegistry::new();
    let wrapper = TypeHash::from_name("Wrapper");
    types
        .register(
            wrapper,
            TypeDef::Class {
                name: "Wrapper".into(),
                base_class: None,
                interfaces: Vec::new(),
                type_kind: TypeKind::Reference,
                conversion_ops: Vec::new(),
                default_converter: Some(Arc::new(NeverAsked)),
            },
        )
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let err = resolver.convert(&Value::Int32(3), wrapper).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
}

#[test]
fn operator_cascade_order() {
    // Source-side explicit operator is reached only when no target-side
    // operator and no source-side implicit operator match
    let mut types = TypeRegistry::new();
    let money = TypeHash::from_name("Money");
    types
        .register(
            money,
            TypeDef::Class {
                name: "Money".into(),
                base_class: None,
                interfaces: Vec::new(),
                type_kind: TypeKind::Value,
                conversion_ops: vec![ConversionOp {
                    direction: ConvDirection::Explicit,
                    from: money,
                    to: builtin::DOUBLE,
                    func: Arc::new(|v: &Value| {
                        v.downcast_object::<f64>()
                            .copied()
                            .map(Value::Double)
                            .ok_or_else(|| anyhow::anyhow!("not a Money instance"))
                    }) as ConvFn,
                }],
                default_converter: None,
            },
        )
        .unwrap();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let amount = Value::Object { type_hash: money, data: Arc::new(12.5f64) };
    let out = resolver.convert(&amount, builtin::DOUBLE).unwrap();
    assert_eq!(out, Value::Double(12.5));
}

#[test]
fn operator_precedence_steps_down_rung_by_rung() {
    let yards = TypeHash::from_name("Yards");
    let meters = TypeHash::from_name("Meters");

    let op = |direction, marker: f64| ConversionOp {
        direction,
        from: yards,
        to: meters,
        func: Arc::new(move |_: &Value| Ok(Value::Double(marker))) as ConvFn,
    };
    let value_class = |name: &str, ops: Vec<ConversionOp>| TypeDef::Class {
        name: name.to_string(),
        base_class: None,
        interfaces: Vec::new(),
        type_kind: TypeKind::Value,
        conversion_ops: ops,
        default_converter: None,
    };
    let resolve = |target_ops: Vec<ConversionOp>, source_ops: Vec<ConversionOp>| {
        let mut types = TypeRegistry::new();
        types.register(yards, value_class("Yards", source_ops)).unwrap();
        types.register(meters, value_class("Meters", target_ops)).unwrap();
        let converters = ConverterRegistry::new();
        let resolver = Resolver::new(&types, &converters);
        let distance = Value::Object { type_hash: yards, data: Arc::new(()) };
        resolver.convert(&distance, meters)
    };

    // All four candidates present: target implicit wins
    let out = resolve(
        vec![op(ConvDirection::Implicit, 1.0), op(ConvDirection::Explicit, 2.0)],
        vec![op(ConvDirection::Implicit, 3.0), op(ConvDirection::Explicit, 4.0)],
    )
    .unwrap();
    assert_eq!(out, Value::Double(1.0));

    // Without the target implicit, the target explicit beats both
    // source-side candidates
    let out = resolve(
        vec![op(ConvDirection::Explicit, 2.0)],
        vec![op(ConvDirection::Implicit, 3.0), op(ConvDirection::Explicit, 4.0)],
    )
    .unwrap();
    assert_eq!(out, Value::Double(2.0));

    // No target-side operators: source implicit before source explicit
    let out = resolve(
        vec![],
        vec![op(ConvDirection::Implicit, 3.0), op(ConvDirection::Explicit, 4.0)],
    )
    .unwrap();
    assert_eq!(out, Value::Double(3.0));

    let out = resolve(vec![], vec![op(ConvDirection::Explicit, 4.0)]).unwrap();
    assert_eq!(out, Value::Double(4.0));

    // No operators at all: the chain exhausts
    let err = resolve(vec![], vec![]).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
}

#[test]
fn format_drives_locale_aware_parsing() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let german = Format {
        decimal_separator: ',',
        thousands_separator: Some('.'),
        datetime_format: None,
    };
    let out = resolver
        .convert_with(&Value::String("1.024,75".into()), builtin::DOUBLE, &german)
        .unwrap();
    assert_eq!(out, Value::Double(1024.75));
}

#[test]
fn try_convert_returns_default_on_failure() {
    let mut types = TypeRegistry::new();
    let mode = build_mode(&mut types);
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let (ok, out) = resolver.try_convert(&Value::String("Release".into()), mode);
    assert!(ok);
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 2 });

    let (ok, out) = resolver.try_convert(&Value::String("Profile".into()), mode);
    assert!(!ok);
    assert_eq!(out, Value::Enum { type_hash: mode, discriminant: 0 });

    let (ok, out) = resolver.try_convert(&Value::Null, builtin::DOUBLE);
    assert!(!ok);
    assert_eq!(out, Value::Double(0.0));
}

#[test]
fn convert_as_generic_form() {
    let types = TypeRegistry::new();
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let n: i64 = resolver.convert_as(&Value::String("123456789".into())).unwrap();
    assert_eq!(n, 123456789);

    let err = resolver.convert_as::<i32>(&Value::String("oops".into())).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
}

#[test]
fn swallowed_failures_appear_in_trace() {
    let mut types = TypeRegistry::new();
    let mode = build_mode(&mut types);
    let converters = ConverterRegistry::new();
    let resolver = Resolver::new(&types, &converters);

    let _ = resolver.convert(&Value::Int32(42), mode);
    let trace = resolver.take_trace();
    assert!(!trace.is_empty());
    assert!(format!("{}", trace).contains("not a declared variant"));
}

#[test]
fn concurrent_registration_and_lookup() {
    use std::thread;

    let converters = Arc::new(ConverterRegistry::new());

    let writer = {
        let converters = Arc::clone(&converters);
        thread::spawn(move || {
            for i in 0..100u64 {
                let hash = TypeHash::from_name(&format!("T{}", i));
                converters.register(hash, Arc::new(StringWrapper)).unwrap();
            }
        })
    };
    let reader = {
        let converters = Arc::clone(&converters);
        thread::spawn(move || {
            for _ in 0..1000 {
                let _ = converters.lookup(builtin::STRING);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(converters.snapshot().len(), 100);
}

//! The decoder assembly.
//!
//! Decoders for one call input are created by running a processing over
//! the `create` context. Each handler looks at the input type; the first
//! one that knows the type emits its decodings, marks the input solved
//! and cancels the rest of the chain.
//!
//! | Handler     | Input type                 | Produces                                   |
//! |-------------|----------------------------|--------------------------------------------|
//! | `primitive` | primitive or model property | one scalar parameter                       |
//! | `list`      | collection of primitives   | one exploded list parameter                |
//! | `query`     | query                      | criterion fields plus `asc` / `desc`       |
//! | `option`    | option holder              | one parameter per option property          |
//! | `content`   | model                      | the content decoding                       |

use std::sync::Arc;

use daedalus_core::{
    Arguments, CollectionKind, Criterion, Input, Primitive, Type, TypeQuery, Value,
    FIELD_ASCENDING, FIELD_PRIORITY,
};
use daedalus_processor::{Assembly, Chain, Contexts, Contract, Handler, Key, Processing, ProcessorError};

use crate::decoding::{listed, scalar, ContentDecoding, DecodeSettings, Decoding, DoDecode};
use crate::definition::{Category, Definition};
use crate::error::{CodecAssemblyError, DecodeError};

/// Context the decoder assembly works on.
pub const CREATE: &str = "create";

/// The input to create decoders for.
pub const INPUT: Key<Input> = Key::new(CREATE, "input");
/// The separators in use.
pub const SETTINGS: Key<DecodeSettings> = Key::new(CREATE, "settings");
/// Parameter decodings created for the input.
pub const DECODINGS: Key<Vec<Decoding>> = Key::new(CREATE, "decodings");
/// Content decoding created for the input.
pub const CONTENT: Key<ContentDecoding> = Key::new(CREATE, "content");
/// Set once some handler handled the input.
pub const SOLVED: Key<bool> = Key::new(CREATE, "solved");

/// Name of the ascending ordering parameter.
pub const ORDER_ASCENDING: &str = "asc";
/// Name of the descending ordering parameter.
pub const ORDER_DESCENDING: &str = "desc";

fn contract() -> Contract {
    Contract::new()
        .requires(&INPUT)
        .requires(&SETTINGS)
        .defines_if(&DECODINGS)
        .defines_if(&SOLVED)
}

fn solve(chain: &mut Chain, ctx: &mut Contexts, decodings: Vec<Decoding>) -> Result<(), ProcessorError> {
    ctx.get_or_insert_with(&DECODINGS, Vec::new)?.extend(decodings);
    ctx.set(&SOLVED, true);
    chain.cancel();
    Ok(())
}

fn parameter(
    input: &Input,
    path: Vec<String>,
    target: Vec<String>,
    primitive: Primitive,
    settings: &DecodeSettings,
) -> Decoding {
    let name = path.join(&settings.separator);
    let definition = Definition::new(name.clone(), Category::Parameter, primitive.name(), input.name());
    let definition = if input.has_default() {
        definition.optional()
    } else {
        definition
    };
    Decoding::new(
        input.name(),
        path,
        &settings.separator,
        primitive.name(),
        definition,
        scalar(name, target, primitive),
    )
}

struct PrimitiveDecoder;

impl Handler for PrimitiveDecoder {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn contract(&self) -> Contract {
        contract()
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let input = ctx.get(&INPUT)?;
        let Some(primitive) = input.ty().primitive() else {
            return Ok(());
        };
        let settings = ctx.get(&SETTINGS)?;
        let mut decoding = parameter(
            input,
            vec![input.name().to_string()],
            vec![input.name().to_string()],
            primitive,
            settings,
        );
        if let Type::Property(property) = input.ty() {
            decoding = decoding.for_property(property.qualified_name());
        }
        if !input.has_default() {
            decoding = decoding.mandatory();
        }
        solve(chain, ctx, vec![decoding])
    }
}

struct ListDecoder;

impl Handler for ListDecoder {
    fn name(&self) -> &'static str {
        "list"
    }

    fn contract(&self) -> Contract {
        contract()
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let input = ctx.get(&INPUT)?;
        let Type::Collection(CollectionKind::List | CollectionKind::Iter, item) = input.ty() else {
            return Ok(());
        };
        let Some(primitive) = item.primitive() else {
            return Ok(());
        };
        let settings = ctx.get(&SETTINGS)?;
        let name = input.name().to_string();
        let ty = format!("List({primitive})");
        let definition = Definition::new(name.clone(), Category::Parameter, ty.clone(), input.name());
        let decoding = Decoding::new(
            input.name(),
            vec![name.clone()],
            &settings.separator,
            ty,
            if input.has_default() {
                definition.optional()
            } else {
                definition
            },
            listed(name.clone(), vec![name], primitive, settings.list_separator),
        )
        .list();
        solve(chain, ctx, vec![decoding])
    }
}

struct QueryDecoder;

impl QueryDecoder {
    fn criterion_decodings(
        input: &Input,
        criterion: &Criterion,
        settings: &DecodeSettings,
    ) -> Vec<Decoding> {
        let mut decodings = Vec::new();
        if let Some((field, primitive)) = criterion.main_field() {
            decodings.push(parameter(
                input,
                vec![criterion.name().to_string()],
                vec![input.name().to_string(), criterion.name().to_string(), field.to_string()],
                primitive,
                settings,
            ));
        }
        for (field, primitive) in criterion.fields() {
            decodings.push(parameter(
                input,
                vec![criterion.name().to_string(), field.to_string()],
                vec![input.name().to_string(), criterion.name().to_string(), field.to_string()],
                primitive,
                settings,
            ));
        }
        decodings
    }

    fn order_decoding(
        input: &Input,
        query: &Arc<TypeQuery>,
        parameter: &'static str,
        ascending: bool,
        settings: &DecodeSettings,
    ) -> Decoding {
        let input_name = input.name().to_string();
        let query = Arc::clone(query);
        let separator = settings.list_separator;
        let do_decode: DoDecode = Arc::new(move |arguments: &mut Arguments, text: &str| {
            for name in crate::decoding::explode(text, separator) {
                let ordered = query
                    .criteria()
                    .get(&name)
                    .is_some_and(Criterion::is_ordered);
                if !ordered {
                    return Err(DecodeError::NotOrdered { criterion: name });
                }
                let priority = next_priority(arguments, &input_name);
                if let Some(slot) = arguments.slot(&[input_name.as_str(), name.as_str(), FIELD_ASCENDING]) {
                    *slot = Value::Bool(ascending);
                }
                if let Some(slot) = arguments.slot(&[input_name.as_str(), name.as_str(), FIELD_PRIORITY]) {
                    *slot = Value::Int(priority);
                }
            }
            Ok(())
        });
        let definition = Definition::new(parameter, Category::Parameter, "List(Str)", input.name())
            .optional()
            .describe(if ascending {
                "Criteria to order ascending by, in priority order"
            } else {
                "Criteria to order descending by, in priority order"
            });
        Decoding::new(
            input.name(),
            vec![parameter.to_string()],
            &settings.separator,
            "List(Str)",
            definition,
            do_decode,
        )
        .list()
    }
}

fn next_priority(arguments: &Arguments, input: &str) -> i64 {
    arguments
        .get(input)
        .and_then(Value::as_object)
        .map_or(0, |criteria| {
            criteria
                .values()
                .filter_map(|criterion| criterion.get(FIELD_PRIORITY).and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
        })
        + 1
}

impl Handler for QueryDecoder {
    fn name(&self) -> &'static str {
        "query"
    }

    fn contract(&self) -> Contract {
        contract()
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let input = ctx.get(&INPUT)?;
        let Type::Query(query) = input.ty() else {
            return Ok(());
        };
        let settings = ctx.get(&SETTINGS)?;
        let mut decodings = Vec::new();
        for criterion in query.criteria().values() {
            decodings.extend(Self::criterion_decodings(input, criterion, settings));
        }
        if query.criteria().values().any(Criterion::is_ordered) {
            decodings.push(Self::order_decoding(input, query, ORDER_ASCENDING, true, settings));
            decodings.push(Self::order_decoding(input, query, ORDER_DESCENDING, false, settings));
        }
        solve(chain, ctx, decodings)
    }
}

struct OptionDecoder;

impl Handler for OptionDecoder {
    fn name(&self) -> &'static str {
        "option"
    }

    fn contract(&self) -> Contract {
        contract()
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let input = ctx.get(&INPUT)?;
        let Type::Option(option) = input.ty() else {
            return Ok(());
        };
        let settings = ctx.get(&SETTINGS)?;
        let decodings = option
            .properties()
            .iter()
            .map(|(name, primitive)| {
                let mut decoding = parameter(
                    input,
                    vec![name.clone()],
                    vec![input.name().to_string(), name.clone()],
                    *primitive,
                    settings,
                );
                decoding.definition_mut().is_optional = true;
                decoding
            })
            .collect();
        solve(chain, ctx, decodings)
    }
}

struct ContentDecoder;

impl Handler for ContentDecoder {
    fn name(&self) -> &'static str {
        "content"
    }

    fn contract(&self) -> Contract {
        contract().defines_if(&CONTENT)
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let input = ctx.get(&INPUT)?;
        let Type::Model(model) = input.ty() else {
            return Ok(());
        };
        let content = ContentDecoding::new(input.name(), Arc::clone(model));
        ctx.set(&CONTENT, content);
        ctx.set(&SOLVED, true);
        chain.cancel();
        Ok(())
    }
}

/// The decoder assembly, in handler order.
#[must_use]
pub fn decoder_assembly() -> Assembly {
    Assembly::new("decoder")
        .add(PrimitiveDecoder)
        .add(ListDecoder)
        .add(QueryDecoder)
        .add(OptionDecoder)
        .add(ContentDecoder)
}

/// What the decoder assembly made of one input.
#[derive(Debug, Clone, Default)]
pub struct Created {
    /// Parameter decodings.
    pub decodings: Vec<Decoding>,
    /// Content decoding.
    pub content: Option<ContentDecoding>,
    /// Whether some decoder handled the input.
    pub solved: bool,
}

impl Created {
    /// Moves the results out of a bag the decoder assembly ran over.
    pub fn take(ctx: &mut Contexts) -> Self {
        Self {
            decodings: ctx.take(&DECODINGS).unwrap_or_default(),
            content: ctx.take(&CONTENT),
            solved: ctx.take(&SOLVED).unwrap_or(false),
        }
    }
}

/// Standalone runner of the decoder assembly.
///
/// # Example
///
/// ```
/// use daedalus_codec::{DecodeSettings, Decoders};
/// use daedalus_core::{Input, Primitive, Type};
///
/// let decoders = Decoders::new(DecodeSettings::default()).unwrap();
/// let created = decoders.create(&Input::new("id", Type::Primitive(Primitive::Int))).unwrap();
/// assert!(created.solved);
/// assert_eq!(created.decodings[0].name(), "id");
/// ```
#[derive(Debug, Clone)]
pub struct Decoders {
    processing: Arc<Processing>,
    settings: DecodeSettings,
}

impl Decoders {
    /// Compiles the decoder assembly.
    pub fn new(settings: DecodeSettings) -> Result<Self, CodecAssemblyError> {
        let processing = decoder_assembly().create(&[INPUT.attribute(), SETTINGS.attribute()])?;
        Ok(Self {
            processing: Arc::new(processing),
            settings,
        })
    }

    /// Creates the decoders of one input.
    pub fn create(&self, input: &Input) -> Result<Created, CodecAssemblyError> {
        let mut ctx = self.processing.contexts();
        ctx.set(&INPUT, input.clone());
        ctx.set(&SETTINGS, self.settings.clone());
        Chain::new(&self.processing).process(&mut ctx)?;
        let created = Created::take(&mut ctx);
        tracing::debug!(
            input = input.name(),
            solved = created.solved,
            decodings = created.decodings.len(),
            "Created decoders"
        );
        Ok(created)
    }
}

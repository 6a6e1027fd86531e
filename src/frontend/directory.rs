//! Directory resolution: reads every configuration file of a directory,
//! builds its root scope and expands its module calls and resources into a
//! [Document].
use path_absolutize::Absolutize;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, EvalError, ParseError, ResolutionError};
use crate::frontend::eval::Evaluator;
use crate::frontend::expand::BlockResolver;
use crate::frontend::meta::{IdGenerator, ModulePath, META_KEY};
use crate::frontend::module::Manifest;
use crate::frontend::scope::Scope;
use crate::frontend::source::{parse_source, SourceAttribute, SourceBlock, SourceFile};
use crate::value::{Map, Value};
use crate::{map, Document, Loader, ResolveOptions};

/// Everything a directory resolution produced.
pub(crate) struct DirectoryResult {
    pub document: Document,
    /// Values of the directory's `output` blocks.
    pub outputs: Map,
}

/// State shared by every directory resolved in one run.
pub struct Resolver<'a> {
    pub(crate) loader: &'a dyn Loader,
    pub(crate) options: &'a ResolveOptions,
    pub(crate) evaluator: Evaluator,
    pub(crate) ids: IdGenerator,
    pub(crate) root: PathBuf,
    pub(crate) manifest: Option<Manifest>,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &Path, loader: &'a dyn Loader, options: &'a ResolveOptions) -> Self {
        Resolver {
            loader,
            options,
            evaluator: Evaluator::new(),
            ids: IdGenerator::new(),
            root: root.to_path_buf(),
            manifest: Manifest::load(root, loader),
        }
    }

    /// Resolves the root directory and every module it calls.
    pub fn resolve(&self) -> Result<Document, Error> {
        let mut stack = Vec::new();
        let result = self.resolve_dir(&self.root, None, &ModulePath::root(), &mut stack)?;
        Ok(result.document)
    }

    pub(crate) fn blocks(&self) -> BlockResolver<'_> {
        BlockResolver {
            evaluator: &self.evaluator,
            ids: &self.ids,
            lenient: self.options.lenient,
        }
    }

    /// Resolves one directory. `args` are the arguments of the module call
    /// that reached it, or `None` for the root directory, whose variables
    /// come from tfvars files and the resolve options.
    pub(crate) fn resolve_dir(
        &self,
        dir: &Path,
        args: Option<Map>,
        module_path: &ModulePath,
        stack: &mut Vec<PathBuf>,
    ) -> Result<DirectoryResult, Error> {
        let absolute = dir
            .absolutize()
            .map_err(|source| ParseError::Unreadable {
                path: dir.to_path_buf(),
                source,
            })?
            .to_path_buf();
        if stack.contains(&absolute) {
            let mut chain = stack.clone();
            chain.push(absolute);
            return Err(ResolutionError::Cycle { chain }.into());
        }

        log::debug!("resolving directory {}", absolute.display());
        stack.push(absolute.clone());
        let result = self.resolve_files(&absolute, args, module_path, stack);
        stack.pop();
        result
    }

    fn resolve_files(
        &self,
        dir: &Path,
        args: Option<Map>,
        module_path: &ModulePath,
        stack: &mut Vec<PathBuf>,
    ) -> Result<DirectoryResult, Error> {
        let paths = self.list(dir)?;
        let files = self.parse_files(&paths, "tf")?;
        let blocks: Vec<&SourceBlock> = files.iter().flat_map(|f| f.blocks.iter()).collect();

        let inputs = match args {
            Some(args) => args,
            None => self.root_inputs(&paths)?,
        };

        let mut scope = Scope::root();
        self.bind_placeholders(&blocks, &mut scope);
        scope.bind("var", Value::Map(self.variables(of_kind(&blocks, "variable"), inputs)?));
        scope.bind(
            "path",
            Value::Map(map! {
                "module" => dir.display().to_string(),
                "root" => self.root.display().to_string(),
                "cwd" => std::env::current_dir().map(|d| d.display().to_string()).unwrap_or_default(),
            }),
        );
        scope.bind(
            "terraform",
            Value::Map(map! { "workspace" => self.options.workspace.as_str() }),
        );

        let locals: Vec<_> = of_kind(&blocks, "locals")
            .flat_map(|b| b.attributes.iter().map(move |a| (b, a)))
            .collect();
        self.bind_locals(&locals, &mut scope)?;
        self.bind_declared(&blocks, &mut scope);

        let mut module_instances = Vec::new();
        let mut children = Vec::new();
        let mut module_outputs = Map::new();
        for block in of_kind(&blocks, "module") {
            let outcome = self.call_module(block, &scope, dir, module_path, stack)?;
            module_instances.extend(outcome.instances);
            children.extend(outcome.contents);
            if let Some(label) = block.label(0) {
                module_outputs.insert(label.to_string(), outcome.outputs);
                scope.bind("module", Value::Map(module_outputs.clone()));
            }
        }
        if !locals.is_empty() {
            // locals may read module outputs and declared attributes
            self.bind_locals(&locals, &mut scope)?;
            self.bind_declared(&blocks, &mut scope);
        } else if !module_outputs.is_empty() {
            self.bind_declared(&blocks, &mut scope);
        }

        let mut document = Document::new();
        for block in of_kind(&blocks, "resource") {
            let (Some(kind), Some(name)) = (block.label(0), block.label(1)) else {
                return Err(Error::eval(
                    block.location(),
                    EvalError::Unsupported("resource block needs a type and a name label".into()),
                ));
            };
            let instances = self
                .blocks()
                .expand(block, &scope, kind, |key| module_path.address(kind, name, key))?;
            push_all(&mut document, kind, instances.into_iter().map(|(_, i)| i));
        }
        push_all(&mut document, "module", module_instances);
        for child in children {
            for (kind, instances) in child {
                push_all(&mut document, &kind, instances);
            }
        }

        let mut outputs = Map::new();
        for block in of_kind(&blocks, "output") {
            let Some(name) = block.label(0) else { continue };
            let value = match block.attribute("value") {
                Some(attr) => self.blocks().attribute(block, attr, &scope)?,
                None => Value::Null,
            };
            outputs.insert(name.to_string(), value);
        }

        Ok(DirectoryResult { document, outputs })
    }

    /// Files directly inside `dir`, in lexical order.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, ParseError> {
        let mut paths = self.loader.list_files(dir).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ParseError::MissingDirectory {
                path: dir.to_path_buf(),
            },
            _ => ParseError::Unreadable {
                path: dir.to_path_buf(),
                source,
            },
        })?;
        paths.sort();
        Ok(paths)
    }

    /// Parses the files with the given extension. Unparsable files abort
    /// the run unless `stop_on_hcl_error` is off, in which case they are
    /// skipped.
    fn parse_files(&self, paths: &[PathBuf], extension: &str) -> Result<Vec<SourceFile>, ParseError> {
        let mut files = Vec::new();
        for path in paths
            .iter()
            .filter(|p| p.extension().is_some_and(|e| e == extension))
        {
            match self.parse_file(path) {
                Ok(file) => files.push(file),
                Err(e @ ParseError::Syntax { .. }) if !self.options.stop_on_hcl_error => {
                    log::warn!("skipping {}: {e}", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(files)
    }

    fn parse_file(&self, path: &Path) -> Result<SourceFile, ParseError> {
        let content = self.loader.load(path).map_err(|source| ParseError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        parse_source(&name, &content)
    }

    /// Variable values of the root directory, lowest precedence first:
    /// `terraform.tfvars`, `*.auto.tfvars`, option `var_files`, option `vars`.
    fn root_inputs(&self, paths: &[PathBuf]) -> Result<Map, Error> {
        let mut tfvars: Vec<&PathBuf> = paths
            .iter()
            .filter(|p| p.file_name().is_some_and(|n| n == "terraform.tfvars"))
            .collect();
        tfvars.extend(paths.iter().filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".auto.tfvars"))
        }));
        tfvars.extend(self.options.var_files.iter());

        let mut inputs = Map::new();
        for path in tfvars {
            let file = self.parse_file(path)?;
            for attr in &file.attributes {
                let value = self
                    .evaluator
                    .evaluate(&attr.expr, &Scope::root())
                    .map_err(|e| Error::eval(format!("{}:{}", file.name, attr.line), e))?;
                inputs.insert(attr.key.clone(), value);
            }
        }
        for (name, value) in &self.options.vars {
            inputs.insert(name.clone(), value.clone());
        }
        Ok(inputs)
    }

    /// Declared variables: defaults overridden by `inputs`. A declared
    /// variable without any value is Null.
    fn variables<'b>(
        &self,
        declared: impl Iterator<Item = &'b SourceBlock>,
        mut inputs: Map,
    ) -> Result<Map, Error> {
        let empty = Scope::root();
        let mut vars = Map::new();
        for block in declared {
            let Some(name) = block.label(0) else { continue };
            let value = match inputs.shift_remove(name) {
                Some(value) => value,
                None => match block.attribute("default") {
                    Some(attr) => self.blocks().attribute(block, attr, &empty)?,
                    None => Value::Null,
                },
            };
            vars.insert(name.to_string(), value);
        }
        for name in inputs.keys() {
            log::debug!("ignoring value for undeclared variable \"{name}\"");
        }
        Ok(vars)
    }

    /// Evaluates locals in dependency order, whatever order they are
    /// declared in.
    fn bind_locals(
        &self,
        locals: &[(&SourceBlock, &SourceAttribute)],
        scope: &mut Scope<'static>,
    ) -> Result<(), Error> {
        let mut values = Map::new();
        scope.bind("local", Value::Map(values.clone()));
        let mut pending: Vec<_> = locals.to_vec();
        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();
            let mut last_error = None;
            for (block, attr) in pending {
                match self.evaluator.evaluate(&attr.expr, scope) {
                    Ok(value) => {
                        values.insert(attr.key.clone(), value);
                        scope.bind("local", Value::Map(values.clone()));
                    }
                    Err(e) if e.is_pending_local() => {
                        last_error = Some((block, attr, e));
                        waiting.push((block, attr));
                    }
                    Err(_) => {
                        // reports the error, or substitutes null when lenient
                        let value = self.blocks().attribute(block, attr, scope)?;
                        values.insert(attr.key.clone(), value);
                        scope.bind("local", Value::Map(values.clone()));
                    }
                }
            }
            if waiting.len() == before {
                if let Some((block, attr, e)) = last_error.filter(|_| !self.options.lenient) {
                    return Err(Error::eval(
                        format!("{}:{}: {}", block.span.filename, attr.line, attr.key),
                        e,
                    ));
                }
                for (_, attr) in waiting {
                    log::warn!("local \"{}\" could not be resolved; using null", attr.key);
                    values.insert(attr.key.clone(), Value::Null);
                }
                scope.bind("local", Value::Map(values.clone()));
                break;
            }
            pending = waiting;
        }
        Ok(())
    }

    /// Names whose shape is known before anything is provisioned:
    /// declared resources, data sources and module calls, all unknown.
    fn bind_placeholders(&self, blocks: &[&SourceBlock], scope: &mut Scope) {
        let mut resources: Map = Map::new();
        let mut data = Map::new();
        let mut modules = Map::new();
        for block in blocks {
            match (block.ident.as_str(), block.label(0), block.label(1)) {
                ("resource", Some(kind), Some(name)) => insert_placeholder(&mut resources, kind, name),
                ("data", Some(kind), Some(name)) => insert_placeholder(&mut data, kind, name),
                ("module", Some(label), _) => {
                    modules.insert(label.to_string(), Value::Null);
                }
                _ => {}
            }
        }
        for (kind, names) in resources {
            scope.bind(kind, names);
        }
        scope.bind("data", Value::Map(data));
        scope.bind("module", Value::Map(modules));
    }

    /// Rebinds declared resources and data sources to the attributes they
    /// state. Passes repeat until references between them settle.
    fn bind_declared(&self, blocks: &[&SourceBlock], scope: &mut Scope) {
        let mut previous: Option<(Map, Map)> = None;
        for _ in 0..=blocks.len() {
            let mut resources = Map::new();
            let mut data = Map::new();
            for block in blocks {
                let target = match block.ident.as_str() {
                    "resource" => &mut resources,
                    "data" => &mut data,
                    _ => continue,
                };
                let (Some(kind), Some(name)) = (block.label(0), block.label(1)) else {
                    continue;
                };
                insert_record(target, kind, name, self.declared_record(block, scope));
            }
            if previous.as_ref() == Some(&(resources.clone(), data.clone())) {
                break;
            }
            for (kind, names) in &resources {
                scope.bind(kind.clone(), names.clone());
            }
            scope.bind("data", Value::Map(data.clone()));
            previous = Some((resources, data));
        }
    }

    /// Attributes of a single block that evaluate in `scope`. Repeated
    /// blocks stay null, as do attributes that do not evaluate yet.
    fn declared_record(&self, block: &SourceBlock, scope: &Scope) -> Value {
        if block.attribute("count").is_some() || block.attribute("for_each").is_some() {
            return Value::Null;
        }
        let mut record = map! { META_KEY => Value::Map(Map::new()) };
        for attr in &block.attributes {
            if let Ok(value) = self.evaluator.evaluate(&attr.expr, scope) {
                record.insert(attr.key.clone(), value);
            }
        }
        Value::Map(record)
    }
}

fn of_kind<'b>(
    blocks: &'b [&'b SourceBlock],
    ident: &'static str,
) -> impl Iterator<Item = &'b SourceBlock> + 'b {
    blocks.iter().copied().filter(move |b| b.ident == ident)
}

fn insert_placeholder(map: &mut Map, kind: &str, name: &str) {
    insert_record(map, kind, name, Value::Null);
}

fn insert_record(map: &mut Map, kind: &str, name: &str, record: Value) {
    if let Value::Map(names) = map
        .entry(kind.to_string())
        .or_insert_with(|| Value::Map(Map::new()))
    {
        names.insert(name.to_string(), record);
    }
}

/// Appends instances to a bucket, creating it only when there is something to add.
fn push_all(document: &mut Document, kind: &str, instances: impl IntoIterator<Item = Map>) {
    for instance in instances {
        document.entry(kind.to_string()).or_default().push(instance);
    }
}

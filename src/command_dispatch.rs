//! Purpose: Hold top-level CLI command dispatch for `islandora-rest`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and map each subcommand onto one client call.
//! Invariants: Every command emits exactly one JSON value, except `search --all` (JSON lines)
//!             and raw content downloads (bytes).
//! Invariants: `search --objects` without `--all` folds profiles into `{"page", "objects"}`.

use super::*;
use islandora_rest::api::{
    DatastreamContent, DatastreamOptions, RelationshipQuery, SearchPage, Transport, Triple,
};
use std::fs::File;
use std::io::Write;

pub(super) fn dispatch_command<T: Transport>(
    command: Command,
    client: &IslandoraClient<T>,
) -> Result<(), Error> {
    match command {
        Command::Object(command) => dispatch_object(command, client),
        Command::Search(args) => dispatch_search(args, client),
        Command::Relationship(command) => dispatch_relationship(command, client),
        Command::ContentModel(ContentModelCommand::Add {
            pid,
            model,
            exclusive,
        }) => {
            let outcome = client.add_content_model(&pid, &model, exclusive)?;
            emit_json(json!({ "content_model": outcome }));
            Ok(())
        }
        Command::Collection(CollectionCommand::Add { pid, parent }) => {
            let outcome = client.add_collection_membership(&pid, &parent)?;
            emit_json(json!({ "collection": outcome }));
            Ok(())
        }
        Command::Collection(CollectionCommand::Remove { pid, parent }) => {
            client.remove_collection_membership(&pid, &parent)?;
            emit_json(json!({ "removed": { "pid": pid, "collection": parent } }));
            Ok(())
        }
        Command::Datastream(command) => dispatch_datastream(command, client),
        Command::Ku(command) => dispatch_ku(command, client),
    }
}

fn dispatch_object<T: Transport>(
    command: ObjectCommand,
    client: &IslandoraClient<T>,
) -> Result<(), Error> {
    match command {
        ObjectCommand::Get { pid } => {
            let profile = client.get_object(&pid)?;
            emit_json(to_value(&profile)?);
        }
        ObjectCommand::Create {
            pid,
            namespace,
            label,
            owner,
            state,
            fields,
        } => {
            let mut params = Params::new();
            set_opt(&mut params, "pid", pid);
            set_opt(&mut params, "namespace", namespace);
            set_opt(&mut params, "label", label);
            set_opt(&mut params, "owner", owner);
            set_opt(&mut params, "state", state);
            params.extend(&parse_assignments(&fields)?);
            let profile = client.create_object(&params)?;
            emit_json(to_value(&profile)?);
        }
        ObjectCommand::Update {
            pid,
            label,
            owner,
            state,
            fields,
        } => {
            let mut changes = Params::new();
            set_opt(&mut changes, "label", label);
            set_opt(&mut changes, "owner", owner);
            set_opt(&mut changes, "state", state);
            changes.extend(&parse_assignments(&fields)?);
            let profile = client.update_object(&pid, &changes)?;
            emit_json(to_value(&profile)?);
        }
        ObjectCommand::Delete { pid } => {
            client.delete_object(&pid)?;
            emit_json(json!({ "deleted": { "pid": pid } }));
        }
    }
    Ok(())
}

fn dispatch_search<T: Transport>(
    args: SearchArgs,
    client: &IslandoraClient<T>,
) -> Result<(), Error> {
    let mut params = Params::new();
    set_opt(&mut params, "fl", args.fl);
    set_opt(&mut params, "rows", args.rows);
    set_opt(&mut params, "sort", args.sort);
    set_opt(&mut params, "start", args.start);
    params.extend(&parse_assignments(&args.params)?);

    if !args.all {
        let page = client.solr_query(&args.query, &params)?;
        let page_value = to_value::<SearchPage>(&page)?;
        if !args.objects {
            emit_json(page_value);
            return Ok(());
        }
        let objects = page
            .response
            .docs
            .iter()
            .map(|doc| fetch_profile(client, doc))
            .collect::<Result<Vec<_>, _>>()?;
        emit_json(json!({ "page": page_value, "objects": objects }));
        return Ok(());
    }

    for doc in client.solr_cursor(&args.query, params) {
        let doc = doc?;
        if args.objects {
            let object = fetch_profile(client, &doc)?;
            emit_json_line(&json!({ "doc": doc, "object": object }));
        } else {
            emit_json_line(&doc);
        }
    }
    Ok(())
}

/// Profile of the document's `PID`, or `null` when the document carries none.
fn fetch_profile<T: Transport>(client: &IslandoraClient<T>, doc: &Value) -> Result<Value, Error> {
    match doc.get("PID").and_then(Value::as_str) {
        Some(pid) => to_value(&client.get_object(pid)?),
        None => Ok(Value::Null),
    }
}

fn dispatch_relationship<T: Transport>(
    command: RelationshipCommand,
    client: &IslandoraClient<T>,
) -> Result<(), Error> {
    match command {
        RelationshipCommand::List {
            pid,
            predicate,
            namespace,
            object,
            literal,
        } => {
            let query = RelationshipQuery {
                predicate,
                namespace,
                object,
                literal,
            };
            let relationships = client.get_relationships(&pid, &query)?;
            emit_json(to_value(&relationships)?);
        }
        RelationshipCommand::Add {
            pid,
            namespace,
            predicate,
            object,
            object_type,
        } => {
            let triple = Triple::uri(namespace, predicate, object).with_type(object_type.into());
            client.add_relationship(&pid, &triple)?;
            emit_json(json!({
                "added": {
                    "pid": pid,
                    "uri": triple.namespace,
                    "predicate": triple.predicate,
                    "object": triple.object,
                    "type": triple.object_type.as_str(),
                }
            }));
        }
        RelationshipCommand::Remove {
            pid,
            predicate,
            namespace,
            object,
            literal,
        } => {
            let pattern = RelationshipQuery {
                predicate: Some(predicate),
                namespace,
                object,
                literal: Some(literal),
            };
            client.remove_relationship(&pid, &pattern)?;
            emit_json(json!({
                "removed": {
                    "pid": pid,
                    "predicate": pattern.predicate,
                    "uri": pattern.namespace,
                    "object": pattern.object,
                }
            }));
        }
    }
    Ok(())
}

fn dispatch_datastream<T: Transport>(
    command: DatastreamCommand,
    client: &IslandoraClient<T>,
) -> Result<(), Error> {
    match command {
        DatastreamCommand::Get {
            pid,
            dsid,
            version,
            out,
        } => {
            let mut reader = client.open_datastream(&pid, &dsid, version.as_deref())?;
            copy_to_output(&mut reader, out.as_deref())?;
        }
        DatastreamCommand::Info { pid, dsid, version } => {
            let info = client.get_datastream_info(&pid, &dsid, version.as_deref())?;
            emit_json(info);
        }
        DatastreamCommand::Create {
            pid,
            dsid,
            content,
            no_versionable,
            meta,
        } => {
            let content = DatastreamContent::from_sources(content.file, content.string)?;
            let options = datastream_options(meta)?.versionable(!no_versionable);
            let created = client.create_datastream(&pid, &dsid, content, options)?;
            emit_json(created);
        }
        DatastreamCommand::Update {
            pid,
            dsid,
            content,
            versionable,
            meta,
        } => {
            let content = DatastreamContent::from_sources(content.file, content.string)?;
            let mut options = datastream_options(meta)?;
            options.versionable = versionable;
            client.update_datastream(&pid, &dsid, content, options)?;
            emit_json(json!({ "updated": { "pid": pid, "dsid": dsid } }));
        }
        DatastreamCommand::Delete { pid, dsid } => {
            client.delete_datastream(&pid, &dsid)?;
            emit_json(json!({ "deleted": { "pid": pid, "dsid": dsid } }));
        }
    }
    Ok(())
}

fn datastream_options(meta: DatastreamMetaArgs) -> Result<DatastreamOptions, Error> {
    let mut options = DatastreamOptions::new();
    set_opt(&mut options.metadata, "label", meta.label);
    set_opt(&mut options.metadata, "state", meta.state);
    set_opt(&mut options.metadata, "mimeType", meta.mime_type);
    options.metadata.extend(&parse_assignments(&meta.fields)?);
    Ok(options)
}

fn dispatch_ku<T: Transport>(command: KuCommand, client: &IslandoraClient<T>) -> Result<(), Error> {
    let ku = client.ku();
    match command {
        KuCommand::Regen { pid, dsid, params } => {
            ku.regen(&pid, dsid.as_deref(), &parse_assignments(&params)?)?;
            emit_json(json!({ "regen": { "pid": pid, "dsid": dsid } }));
        }
        KuCommand::Premis { pid, params, out } => {
            let premis = ku.premis(&pid, &parse_assignments(&params)?)?;
            copy_to_output(&mut premis.as_slice(), out.as_deref())?;
        }
        KuCommand::Reindex { pid, params } => {
            ku.reindex(&pid, &parse_assignments(&params)?)?;
            emit_json(json!({ "reindex": { "pid": pid } }));
        }
    }
    Ok(())
}

fn set_opt<V: ToString>(params: &mut Params, key: &str, value: Option<V>) {
    if let Some(value) = value {
        params.insert(key, value);
    }
}

fn to_value<S: serde::Serialize>(value: &S) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output json")
            .with_source(err)
    })
}

fn emit_json_line(value: &Value) {
    let line = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{line}");
}

fn copy_to_output(reader: &mut dyn io::Read, out: Option<&std::path::Path>) -> Result<(), Error> {
    let result = match out {
        Some(path) => File::create(path).and_then(|mut file| {
            io::copy(reader, &mut file)?;
            file.flush()
        }),
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            io::copy(reader, &mut lock).and_then(|_| lock.flush())
        }
    };
    result.map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write content")
            .with_source(err)
    })
}

//! Engine-service surface of the simulator
//!
//! The virtual filesystem, encoding and digests, the instance cache
//! and registry, drawings, websockets, input, and the miscellaneous
//! executor services. Filesystem paths are plain keys into flat maps;
//! no real file is ever touched.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::Rng;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::errors::ProbeError;
use crate::namespace::{host_fn, Namespace};

use super::{want_bool, want_num, want_obj, want_str, want_val, SimState};

const DRAWING_CLASSES: &[&str] = &[
    "Circle", "Image", "Line", "Quad", "Square", "Text", "Triangle",
];

pub(super) fn install(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    install_filesystem(ns, state);
    install_crypt(ns, state);
    install_cache(ns, state);
    install_instances(ns, state);
    install_drawing(ns, state);
    install_websocket(ns, state);
    install_input(ns);
    install_misc(ns, state);
}

fn direct_child(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

fn install_filesystem(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "writefile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "writefile")?;
            let contents = want_str(&args, 1, "writefile")?;
            let mut sim = st.lock().unwrap();
            sim.files.insert(path, contents);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "readfile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "readfile")?;
            let sim = st.lock().unwrap();
            let contents = sim
                .files
                .get(&path)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("{path}: file does not exist")))?;
            Ok(vec![json!(contents)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "appendfile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "appendfile")?;
            let contents = want_str(&args, 1, "appendfile")?;
            let mut sim = st.lock().unwrap();
            sim.files.entry(path).or_default().push_str(&contents);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "isfile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "isfile")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.files.contains_key(&path))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "isfolder",
        host_fn(move |args| {
            let path = want_str(&args, 0, "isfolder")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.folders.contains(&path))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "makefolder",
        host_fn(move |args| {
            let path = want_str(&args, 0, "makefolder")?;
            let mut sim = st.lock().unwrap();
            sim.folders.insert(path);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "delfolder",
        host_fn(move |args| {
            let path = want_str(&args, 0, "delfolder")?;
            let mut sim = st.lock().unwrap();
            sim.folders.remove(&path);
            let prefix = format!("{path}/");
            sim.folders.retain(|folder| !folder.starts_with(&prefix));
            sim.files.retain(|file, _| !file.starts_with(&prefix));
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "delfile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "delfile")?;
            let mut sim = st.lock().unwrap();
            sim.files
                .remove(&path)
                .ok_or_else(|| ProbeError::new(format!("{path}: file does not exist")))?;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "listfiles",
        host_fn(move |args| {
            let folder = want_str(&args, 0, "listfiles")?;
            let sim = st.lock().unwrap();
            if !sim.folders.contains(&folder) {
                return Err(ProbeError::new(format!(
                    "{folder}: folder does not exist"
                )));
            }
            let prefix = format!("{folder}/");
            let mut entries: Vec<String> = sim
                .files
                .keys()
                .filter(|path| direct_child(path, &prefix))
                .cloned()
                .collect();
            entries.extend(
                sim.folders
                    .iter()
                    .filter(|path| direct_child(path, &prefix))
                    .cloned(),
            );
            entries.sort();
            Ok(vec![json!(entries)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "loadfile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "loadfile")?;
            let mut sim = st.lock().unwrap();
            if !sim.files.contains_key(&path) {
                return Err(ProbeError::new(format!("{path}: file does not exist")));
            }
            let handle = sim.next_chunk();
            Ok(vec![json!(handle)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "dofile",
        host_fn(move |args| {
            let path = want_str(&args, 0, "dofile")?;
            let sim = st.lock().unwrap();
            if !sim.files.contains_key(&path) {
                return Err(ProbeError::new(format!("{path}: file does not exist")));
            }
            Ok(vec![])
        }),
    );
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

fn install_crypt(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let encode = host_fn(|args| {
        let data = want_str(&args, 0, "base64encode")?;
        Ok(vec![json!(STANDARD.encode(data.as_bytes()))])
    });
    ns.insert_fn("base64encode", Arc::clone(&encode));
    ns.insert_fn("crypt.base64encode", Arc::clone(&encode));
    ns.insert_fn("crypt.base64.encode", encode);

    let decode = host_fn(|args| {
        let data = want_str(&args, 0, "base64decode")?;
        let bytes = STANDARD
            .decode(data.as_bytes())
            .map_err(|_| ProbeError::new("invalid base64 payload"))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ProbeError::new("invalid utf-8 in decoded payload"))?;
        Ok(vec![json!(text)])
    });
    ns.insert_fn("base64decode", Arc::clone(&decode));
    ns.insert_fn("crypt.base64decode", Arc::clone(&decode));
    ns.insert_fn("crypt.base64.decode", decode);

    // XOR keystream stands in for a real cipher; it only has to be
    // reversible and key-dependent
    ns.insert_fn(
        "crypt.encrypt",
        host_fn(|args| {
            let data = want_str(&args, 0, "crypt.encrypt")?;
            let key = want_str(&args, 1, "crypt.encrypt")?;
            if key.is_empty() {
                return Err(ProbeError::new(
                    "bad argument #2 to 'crypt.encrypt' (key must not be empty)",
                ));
            }
            let sealed = STANDARD.encode(xor_with_key(data.as_bytes(), key.as_bytes()));
            Ok(vec![json!(sealed)])
        }),
    );

    ns.insert_fn(
        "crypt.decrypt",
        host_fn(|args| {
            let sealed = want_str(&args, 0, "crypt.decrypt")?;
            let key = want_str(&args, 1, "crypt.decrypt")?;
            if key.is_empty() {
                return Err(ProbeError::new(
                    "bad argument #2 to 'crypt.decrypt' (key must not be empty)",
                ));
            }
            let bytes = STANDARD
                .decode(sealed.as_bytes())
                .map_err(|_| ProbeError::new("invalid base64 ciphertext"))?;
            let text = String::from_utf8(xor_with_key(&bytes, key.as_bytes()))
                .map_err(|_| ProbeError::new("decryption produced invalid utf-8"))?;
            Ok(vec![json!(text)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "crypt.generatebytes",
        host_fn(move |args| {
            let count = want_num(&args, 0, "crypt.generatebytes")?;
            if !(1.0..=1024.0).contains(&count) || count.fract() != 0.0 {
                return Err(ProbeError::new(format!("invalid byte count {count}")));
            }
            let mut sim = st.lock().unwrap();
            let mut bytes = vec![0u8; count as usize];
            sim.rng.fill(&mut bytes[..]);
            Ok(vec![json!(STANDARD.encode(bytes))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "crypt.generatekey",
        host_fn(move |_| {
            let mut sim = st.lock().unwrap();
            let mut bytes = vec![0u8; 32];
            sim.rng.fill(&mut bytes[..]);
            Ok(vec![json!(STANDARD.encode(bytes))])
        }),
    );

    ns.insert_fn(
        "crypt.hash",
        host_fn(|args| {
            let data = want_str(&args, 0, "crypt.hash")?;
            let algorithm = want_str(&args, 1, "crypt.hash")?;
            let digest = match algorithm.as_str() {
                "sha256" => hex::encode(Sha256::digest(data.as_bytes())),
                "sha384" => hex::encode(Sha384::digest(data.as_bytes())),
                "sha512" => hex::encode(Sha512::digest(data.as_bytes())),
                other => {
                    return Err(ProbeError::new(format!(
                        "hash algorithm '{other}' is not supported"
                    )))
                }
            };
            Ok(vec![json!(digest)])
        }),
    );
}

fn install_cache(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "cache.iscached",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "cache.iscached")?;
            let sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "cache.iscached")?;
            Ok(vec![json!(sim.cached.contains(&target))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "cache.invalidate",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "cache.invalidate")?;
            let mut sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "cache.invalidate")?;
            sim.cached.remove(&target);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "cache.replace",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "cache.replace")?;
            let other = want_str(&args, 1, "cache.replace")?;
            let mut sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "cache.replace")?;
            sim.check_instance(&other, "cache.replace")?;
            // the slot stays live with the replacement in it
            sim.cached.insert(target);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "cloneref",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "cloneref")?;
            let mut sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "cloneref")?;
            sim.ref_counter += 1;
            let reference = format!("ref:{target}#{}", sim.ref_counter);
            sim.ref_targets.insert(reference.clone(), target);
            Ok(vec![json!(reference)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "compareinstances",
        host_fn(move |args| {
            let a = want_str(&args, 0, "compareinstances")?;
            let b = want_str(&args, 1, "compareinstances")?;
            let sim = st.lock().unwrap();
            let left = sim.check_instance(&a, "compareinstances")?;
            let right = sim.check_instance(&b, "compareinstances")?;
            Ok(vec![json!(left == right)])
        }),
    );
}

fn install_instances(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "getinstances",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            let all: Vec<String> = sim.instances.iter().cloned().collect();
            Ok(vec![json!(all)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "getnilinstances",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.nil_instances)])
        }),
    );

    ns.insert_fn("gethui", host_fn(|_| Ok(vec![json!("inst:hiddenui")])));

    let st = Arc::clone(state);
    ns.insert_fn(
        "getconnections",
        host_fn(move |args| {
            let signal = want_str(&args, 0, "getconnections")?;
            let sim = st.lock().unwrap();
            let connections = sim
                .signals
                .get(&signal)
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("'{signal}' is not a signal")))?;
            Ok(vec![json!(connections)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "fireclickdetector",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "fireclickdetector")?;
            let sim = st.lock().unwrap();
            sim.check_instance(&handle, "fireclickdetector")?;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "fireproximityprompt",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "fireproximityprompt")?;
            let sim = st.lock().unwrap();
            sim.check_instance(&handle, "fireproximityprompt")?;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "firetouchinterest",
        host_fn(move |args| {
            let part = want_str(&args, 0, "firetouchinterest")?;
            let other = want_str(&args, 1, "firetouchinterest")?;
            let phase = want_num(&args, 2, "firetouchinterest")?;
            if phase != 0.0 && phase != 1.0 {
                return Err(ProbeError::new(format!("invalid touch phase {phase}")));
            }
            let sim = st.lock().unwrap();
            sim.check_instance(&part, "firetouchinterest")?;
            sim.check_instance(&other, "firetouchinterest")?;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "isscriptable",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "isscriptable")?;
            let property = want_str(&args, 1, "isscriptable")?;
            let sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "isscriptable")?;
            let scriptable = sim
                .scriptable
                .get(&format!("{target}/{property}"))
                .copied()
                .ok_or_else(|| ProbeError::new(format!("invalid property '{property}'")))?;
            Ok(vec![json!(scriptable)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "setscriptable",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "setscriptable")?;
            let property = want_str(&args, 1, "setscriptable")?;
            let scriptable = want_bool(&args, 2, "setscriptable")?;
            let mut sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "setscriptable")?;
            let old = sim
                .scriptable
                .insert(format!("{target}/{property}"), scriptable)
                .unwrap_or(false);
            Ok(vec![json!(old)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "gethiddenproperty",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "gethiddenproperty")?;
            let property = want_str(&args, 1, "gethiddenproperty")?;
            let sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "gethiddenproperty")?;
            let value = sim
                .hidden_props
                .get(&format!("{target}/{property}"))
                .copied()
                .ok_or_else(|| {
                    ProbeError::new(format!("'{property}' is not a hidden property"))
                })?;
            Ok(vec![json!(value)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "sethiddenproperty",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "sethiddenproperty")?;
            let property = want_str(&args, 1, "sethiddenproperty")?;
            let value = want_num(&args, 2, "sethiddenproperty")?;
            let mut sim = st.lock().unwrap();
            let target = sim.check_instance(&handle, "sethiddenproperty")?;
            sim.hidden_props.insert(format!("{target}/{property}"), value);
            Ok(vec![json!(true)])
        }),
    );
}

fn install_drawing(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "Drawing.new",
        host_fn(move |args| {
            let class = want_str(&args, 0, "Drawing.new")?;
            if !DRAWING_CLASSES.contains(&class.as_str()) {
                return Err(ProbeError::new(format!(
                    "invalid drawing class '{class}'"
                )));
            }
            let mut sim = st.lock().unwrap();
            sim.drawing_counter += 1;
            let handle = format!("draw:{}#{}", class.to_lowercase(), sim.drawing_counter);
            let mut props = Map::new();
            props.insert("Class".to_string(), json!(class));
            props.insert("Color".to_string(), json!("255,255,255"));
            props.insert("Transparency".to_string(), json!(1.0));
            props.insert("Visible".to_string(), json!(false));
            props.insert("ZIndex".to_string(), json!(0));
            sim.drawings.insert(handle.clone(), props);
            Ok(vec![json!(handle)])
        }),
    );

    ns.insert_value("Drawing.Fonts.UI", json!(0));
    ns.insert_value("Drawing.Fonts.System", json!(1));
    ns.insert_value("Drawing.Fonts.Plex", json!(2));
    ns.insert_value("Drawing.Fonts.Monospace", json!(3));

    let st = Arc::clone(state);
    ns.insert_fn(
        "isrenderobj",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "isrenderobj")?;
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.drawings.contains_key(&handle))])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "getrenderproperty",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "getrenderproperty")?;
            let property = want_str(&args, 1, "getrenderproperty")?;
            let sim = st.lock().unwrap();
            let props = sim
                .drawings
                .get(&handle)
                .ok_or_else(|| ProbeError::new(format!("invalid drawing handle '{handle}'")))?;
            let value = props
                .get(property.as_str())
                .cloned()
                .ok_or_else(|| ProbeError::new(format!("invalid drawing property '{property}'")))?;
            Ok(vec![value])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "setrenderproperty",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "setrenderproperty")?;
            let property = want_str(&args, 1, "setrenderproperty")?;
            let value = want_val(&args, 2, "setrenderproperty")?;
            let mut sim = st.lock().unwrap();
            let props = sim
                .drawings
                .get_mut(&handle)
                .ok_or_else(|| ProbeError::new(format!("invalid drawing handle '{handle}'")))?;
            props.insert(property, value);
            Ok(vec![])
        }),
    );

    // flushing is not observable; drawings stay registered so probes
    // running alongside never lose their handles
    let st = Arc::clone(state);
    ns.insert_fn(
        "cleardrawcache",
        host_fn(move |_| {
            let mut sim = st.lock().unwrap();
            sim.draw_flushes += 1;
            Ok(vec![])
        }),
    );
}

fn install_websocket(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let st = Arc::clone(state);
    ns.insert_fn(
        "WebSocket.connect",
        host_fn(move |args| {
            let url = want_str(&args, 0, "WebSocket.connect")?;
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ProbeError::new(format!("invalid websocket url '{url}'")));
            }
            let mut sim = st.lock().unwrap();
            sim.socket_counter += 1;
            let handle = format!("ws:{}", sim.socket_counter);
            sim.sockets.insert(handle.clone(), VecDeque::new());
            Ok(vec![json!(handle)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "WebSocket.send",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "WebSocket.send")?;
            let frame = want_str(&args, 1, "WebSocket.send")?;
            let mut sim = st.lock().unwrap();
            let queue = sim
                .sockets
                .get_mut(&handle)
                .ok_or_else(|| ProbeError::new("connection is closed"))?;
            queue.push_back(frame);
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "WebSocket.receive",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "WebSocket.receive")?;
            let mut sim = st.lock().unwrap();
            let queue = sim
                .sockets
                .get_mut(&handle)
                .ok_or_else(|| ProbeError::new("connection is closed"))?;
            let frame = queue
                .pop_front()
                .ok_or_else(|| ProbeError::new("timed out waiting for a frame"))?;
            Ok(vec![json!(frame)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "WebSocket.close",
        host_fn(move |args| {
            let handle = want_str(&args, 0, "WebSocket.close")?;
            let mut sim = st.lock().unwrap();
            sim.sockets
                .remove(&handle)
                .ok_or_else(|| ProbeError::new("connection is closed"))?;
            Ok(vec![])
        }),
    );
}

fn install_input(ns: &mut Namespace) {
    let active = host_fn(|_| Ok(vec![json!(true)]));
    ns.insert_fn("isrbxactive", Arc::clone(&active));
    ns.insert_fn("isgameactive", Arc::clone(&active));
    ns.insert_fn("iswindowactive", active);

    // synthetic events are accepted and dropped
    let synthetic = host_fn(|_| Ok(vec![]));
    for name in [
        "mouse1click",
        "mouse1press",
        "mouse1release",
        "mouse2click",
        "mouse2press",
        "mouse2release",
        "mousemoveabs",
        "mousemoverel",
        "mousescroll",
        "keypress",
        "keyrelease",
    ] {
        ns.insert_fn(name, Arc::clone(&synthetic));
    }
}

fn install_misc(ns: &mut Namespace, state: &Arc<Mutex<SimState>>) {
    let who = host_fn(|_| Ok(vec![json!("CapAudit Sim"), json!("1.0.0")]));
    ns.insert_fn("identifyexecutor", Arc::clone(&who));
    ns.insert_fn("getexecutorname", who);

    let request = host_fn(|args| {
        let options = want_obj(&args, 0, "request")?;
        let url = options
            .get("Url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::new("invalid request options: Url is required"))?
            .to_string();
        let method = options
            .get("Method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_string();
        let body = json!({ "url": url, "method": method }).to_string();
        Ok(vec![json!({
            "StatusCode": 200,
            "StatusMessage": "OK",
            "Success": true,
            "Headers": {
                "Content-Type": "application/json",
                "Server": "capaudit-sim",
            },
            "Body": body,
        })])
    });
    ns.insert_fn("request", Arc::clone(&request));
    ns.insert_fn("http.request", Arc::clone(&request));
    ns.insert_fn("http_request", request);

    let st = Arc::clone(state);
    let copy = host_fn(move |args| {
        let text = want_str(&args, 0, "setclipboard")?;
        let mut sim = st.lock().unwrap();
        sim.clipboard = Some(text);
        Ok(vec![])
    });
    ns.insert_fn("setclipboard", Arc::clone(&copy));
    ns.insert_fn("toclipboard", copy);

    let st = Arc::clone(state);
    ns.insert_fn(
        "getclipboard",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.clipboard.clone().unwrap_or_default())])
        }),
    );

    ns.insert_fn(
        "lz4compress",
        host_fn(|args| {
            let data = want_str(&args, 0, "lz4compress")?;
            Ok(vec![json!(format!(
                "lz4:{}",
                STANDARD.encode(data.as_bytes())
            ))])
        }),
    );

    ns.insert_fn(
        "lz4decompress",
        host_fn(|args| {
            let packed = want_str(&args, 0, "lz4decompress")?;
            let size = want_num(&args, 1, "lz4decompress")?;
            if size < 0.0 || size.fract() != 0.0 {
                return Err(ProbeError::new(format!(
                    "invalid decompressed size {size}"
                )));
            }
            let stream = packed
                .strip_prefix("lz4:")
                .ok_or_else(|| ProbeError::new("invalid lz4 stream"))?;
            let bytes = STANDARD
                .decode(stream.as_bytes())
                .map_err(|_| ProbeError::new("invalid lz4 stream"))?;
            if bytes.len() != size as usize {
                return Err(ProbeError::new(format!(
                    "lz4 stream does not decompress to {size} bytes"
                )));
            }
            let text = String::from_utf8(bytes)
                .map_err(|_| ProbeError::new("invalid utf-8 in decompressed payload"))?;
            Ok(vec![json!(text)])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "setfpscap",
        host_fn(move |args| {
            let cap = want_num(&args, 0, "setfpscap")?;
            if cap < 0.0 || cap.fract() != 0.0 {
                return Err(ProbeError::new(format!("invalid frame cap {cap}")));
            }
            let mut sim = st.lock().unwrap();
            sim.fps_cap = cap as u32;
            Ok(vec![])
        }),
    );

    let st = Arc::clone(state);
    ns.insert_fn(
        "gethwid",
        host_fn(move |_| {
            let sim = st.lock().unwrap();
            Ok(vec![json!(sim.hwid.clone())])
        }),
    );

    let st = Arc::clone(state);
    let queue = host_fn(move |args| {
        let source = want_str(&args, 0, "queue_on_teleport")?;
        let mut sim = st.lock().unwrap();
        sim.teleport_queue.push(source);
        Ok(vec![])
    });
    ns.insert_fn("queue_on_teleport", Arc::clone(&queue));
    ns.insert_fn("queueonteleport", queue);

    // always answers as if the OK button was pressed
    ns.insert_fn("messagebox", host_fn(|_| Ok(vec![json!(1)])));
}

use kadmind::{
    kadm5::{AclFile, FieldMask, KeyData, KeySalt, MemoryDatabase, PrincipalEntry},
    server::{
        read_length_prefix, write_frame, write_version, AeadContext, Opcode, SecurityContext, Server,
        SharedKeyAuthenticator,
    },
    wire::{Decoder, Encoder},
    Enctype, Error, Keyblock, Keytype, Principal,
};
use std::{
    io::{Read, Write},
    os::unix::net::UnixStream,
    sync::Arc,
    thread::{self, JoinHandle},
};

const KEY: [u8; 32] = [0x5a; 32];
const REALM: &str = "EXAMPLE.COM";
const ACL: &str = "\
# administrators
*/admin@EXAMPLE.COM   all
reader@EXAMPLE.COM    get,list
editor@EXAMPLE.COM    modify,get
";

fn start_server(server: &Arc<Server>) -> (UnixStream, JoinHandle<anyhow::Result<()>>) {
    let (client_end, server_end) = UnixStream::pair().unwrap();
    let server = Arc::clone(server);
    let handle = thread::spawn(move || server.serve(server_end));
    (client_end, handle)
}

fn new_server() -> Arc<Server> {
    Arc::new(Server::new(
        Arc::new(SharedKeyAuthenticator::new(KEY, REALM.as_bytes())),
        Arc::new(AclFile::parse(ACL).unwrap()),
        Arc::new(MemoryDatabase::new()),
    ))
}

struct Client {
    stream: UnixStream,
    context: AeadContext,
}

impl Client {
    fn connect(server: &Arc<Server>, name: &str) -> (Self, JoinHandle<anyhow::Result<()>>) {
        let (mut stream, handle) = start_server(server);
        write_version(&mut stream).unwrap();
        let context = SharedKeyAuthenticator::new(KEY, REALM.as_bytes())
            .initiate(&mut stream, name)
            .unwrap();
        (Self { stream, context }, handle)
    }

    fn call(&mut self, request: &[u8]) -> Vec<u8> {
        let sealed = self.context.seal(request).unwrap();
        write_frame(&mut self.stream, &sealed).unwrap();
        let length = read_length_prefix(&mut self.stream).unwrap().unwrap();
        let mut sealed = vec![0; length as usize];
        self.stream.read_exact(&mut sealed).unwrap();
        self.context.unseal(&sealed).unwrap().to_vec()
    }

    fn close(self, handle: JoinHandle<anyhow::Result<()>>) {
        drop(self);
        handle.join().unwrap().unwrap();
    }
}

fn status(reply: &[u8]) -> i32 {
    Decoder::new(reply).int32("status").unwrap()
}

fn get(principal: &Principal) -> Vec<u8> {
    Encoder::new()
        .int32(Opcode::GET.0)
        .principal(principal)
        .uint32(FieldMask::ALL.0)
        .finish()
        .to_vec()
}

fn create(principal: &Principal, password: &[u8]) -> Vec<u8> {
    Encoder::new()
        .int32(Opcode::CREATE.0)
        .principal_entry(&PrincipalEntry::new(principal.clone()))
        .uint32(FieldMask::PRINCIPAL.0)
        .data(password)
        .finish()
        .to_vec()
}

fn delete(principal: &Principal) -> Vec<u8> {
    Encoder::new()
        .int32(Opcode::DELETE.0)
        .principal(principal)
        .finish()
        .to_vec()
}

#[test]
fn create_get_delete() {
    let server = new_server();
    let (mut client, handle) = Client::connect(&server, "root/admin");
    let alice = Principal::new(REALM, &["alice"]);

    assert_eq!(status(&client.call(&create(&alice, b"s3cret"))), 0);

    let reply = client.call(&get(&alice));
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    let entry = decoder.principal_entry().unwrap();
    assert_eq!(entry.principal, alice);
    assert_eq!(
        entry.mod_name,
        Some(Principal::new(REALM, &["root", "admin"]))
    );
    assert!(entry.key_data.iter().all(|key_data| key_data.key.contents.iter().all(|b| *b == 0)));

    assert_eq!(
        status(&client.call(&create(&alice, b"again"))),
        Error::KADM5_DUP.code
    );
    assert_eq!(status(&client.call(&delete(&alice))), 0);
    assert_eq!(
        status(&client.call(&get(&alice))),
        Error::KADM5_UNK_PRINC.code
    );

    client.close(handle);
}

#[test]
fn database_is_shared_between_connections() {
    let server = new_server();
    let bob = Principal::new(REALM, &["bob"]);

    let (mut admin, admin_handle) = Client::connect(&server, "root/admin@EXAMPLE.COM");
    assert_eq!(status(&admin.call(&create(&bob, b"pw"))), 0);
    admin.close(admin_handle);

    let (mut reader, reader_handle) = Client::connect(&server, "reader");
    assert_eq!(status(&reader.call(&get(&bob))), 0);

    let reply = reader.call(&Encoder::new().int32(Opcode::LIST.0).int32(0).finish());
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    assert_eq!(decoder.strings().unwrap(), vec!["bob@EXAMPLE.COM".to_owned()]);
    reader.close(reader_handle);
}

#[test]
fn acl_gates_requests() {
    let server = new_server();
    let (mut reader, handle) = Client::connect(&server, "reader");
    let carol = Principal::new(REALM, &["carol"]);

    assert_eq!(
        status(&reader.call(&create(&carol, b"pw"))),
        Error::KADM5_AUTH_INSUFFICIENT.code
    );
    assert_eq!(
        status(&reader.call(&delete(&carol))),
        Error::KADM5_AUTH_INSUFFICIENT.code
    );
    // Permitted, but nothing is there.
    assert_eq!(
        status(&reader.call(&get(&carol))),
        Error::KADM5_UNK_PRINC.code
    );

    let reply = reader.call(&Encoder::new().int32(Opcode::GET_PRIVILEGES.0).finish());
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    assert_eq!(decoder.int32("privileges").unwrap(), 0x11);

    reader.close(handle);
}

#[test]
fn modify_cannot_replace_keys() {
    let server = new_server();
    let dave = Principal::new(REALM, &["dave"]);
    let (mut admin, admin_handle) = Client::connect(&server, "root/admin");
    assert_eq!(status(&admin.call(&create(&dave, b"pw"))), 0);
    admin.close(admin_handle);

    let (mut editor, handle) = Client::connect(&server, "editor");
    let randkey = Encoder::new()
        .int32(Opcode::RANDOM_KEY.0)
        .principal(&dave)
        .finish();
    assert_eq!(
        status(&editor.call(&randkey)),
        Error::KADM5_AUTH_INSUFFICIENT.code
    );

    let forged = PrincipalEntry {
        kvno: 99,
        key_data: vec![KeyData {
            ver: 2,
            kvno: 99,
            key: Keyblock::new(Enctype::AES256_CTS_HMAC_SHA1_96, vec![7; 32]),
            salt: KeySalt::default(),
        }],
        ..PrincipalEntry::new(dave.clone())
    };
    let modify = Encoder::new()
        .int32(Opcode::MODIFY.0)
        .principal_entry(&forged)
        .uint32(FieldMask::KEY_DATA.0 | FieldMask::KVNO.0)
        .finish();
    assert_eq!(status(&editor.call(&modify)), Error::KADM5_BAD_MASK.code);

    let reply = editor.call(&get(&dave));
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    let entry = decoder.principal_entry().unwrap();
    assert_eq!(entry.kvno, 1);
    assert_eq!(entry.key_data.len(), Keytype::defaults().count());
    assert!(entry.key_data.iter().all(|k| k.kvno == 1));

    editor.close(handle);
}

#[test]
fn unknown_caller_holds_nothing() {
    let server = new_server();
    let (mut client, handle) = Client::connect(&server, "mallory");
    assert_eq!(
        status(&client.call(&get(&Principal::new(REALM, &["alice"])))),
        Error::KADM5_AUTH_INSUFFICIENT.code
    );
    client.close(handle);
}

#[test]
fn random_key_returns_fresh_keys() {
    let server = new_server();
    let (mut client, handle) = Client::connect(&server, "root/admin");
    let host = Principal::new(REALM, &["host", "www.example.com"]);
    assert_eq!(status(&client.call(&create(&host, b"pw"))), 0);

    let request = Encoder::new()
        .int32(Opcode::RANDOM_KEY.0)
        .principal(&host)
        .finish();
    let reply = client.call(&request);
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    let keys = decoder.keyblocks().unwrap();
    assert_eq!(keys.len(), Keytype::defaults().count());
    assert!(keys.iter().all(|key| key.contents.iter().any(|b| *b != 0)));

    client.close(handle);
}

#[test]
fn bad_requests_keep_connection_open() {
    let server = new_server();
    let (mut client, handle) = Client::connect(&server, "root/admin");

    // GET with its mask cut off
    let mut truncated = get(&Principal::new(REALM, &["alice"]));
    truncated.truncate(truncated.len() - 2);
    assert_eq!(status(&client.call(&truncated)), Error::HEIM_ERR_EOF.code);
    assert_eq!(status(&client.call(&[])), Error::HEIM_ERR_EOF.code);
    assert_eq!(
        status(&client.call(&9999i32.to_be_bytes())),
        Error::KADM5_FAILURE.code
    );

    let reply = client.call(&Encoder::new().int32(Opcode::GET_PRIVILEGES.0).finish());
    let mut decoder = Decoder::new(&reply);
    assert_eq!(decoder.int32("status").unwrap(), 0);
    assert_eq!(decoder.int32("privileges").unwrap(), 0x3f);

    client.close(handle);
}

#[test]
fn close_before_handshake_is_clean() {
    let server = new_server();
    let (stream, handle) = start_server(&server);
    drop(stream);
    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn refuses_version_4_packet() {
    let server = new_server();
    let (mut stream, handle) = start_server(&server);
    stream.write_all(&0x0030_4b41u32.to_be_bytes()).unwrap();
    let err = handle.join().unwrap().unwrap_err();
    assert!(err.to_string().contains("version 4"));
}

#[test]
fn refuses_bad_sendauth_version() {
    let server = new_server();
    let (mut stream, handle) = start_server(&server);
    write_frame(&mut stream, b"KRB5_SENDAUTH_V2.0\0").unwrap();
    assert!(handle.join().unwrap().is_err());

    let (mut stream, handle) = start_server(&server);
    write_frame(&mut stream, b"short").unwrap();
    assert!(handle.join().unwrap().is_err());
}

#[test]
fn drops_oversized_frame() {
    let server = Arc::new(
        Server::new(
            Arc::new(SharedKeyAuthenticator::new(KEY, REALM.as_bytes())),
            Arc::new(AclFile::parse(ACL).unwrap()),
            Arc::new(MemoryDatabase::new()),
        )
        .with_max_frame_size(64),
    );
    let (mut client, handle) = Client::connect(&server, "root/admin");
    client.stream.write_all(&1000u32.to_be_bytes()).unwrap();
    assert!(handle.join().unwrap().is_err());
}

#[test]
fn drops_frame_sealed_with_wrong_key() {
    let server = new_server();
    let (mut stream, handle) = start_server(&server);
    write_version(&mut stream).unwrap();
    let mut context = SharedKeyAuthenticator::new([0x01; 32], REALM.as_bytes())
        .initiate(&mut stream, "root/admin")
        .unwrap();
    let sealed = context
        .seal(&Encoder::new().int32(Opcode::GET_PRIVILEGES.0).finish())
        .unwrap();
    write_frame(&mut stream, &sealed).unwrap();
    assert!(handle.join().unwrap().is_err());
}

#[test]
fn truncated_frame_is_fatal() {
    let server = new_server();
    let (mut client, handle) = Client::connect(&server, "root/admin");
    client.stream.write_all(&[0, 0]).unwrap();
    drop(client);
    assert!(handle.join().unwrap().is_err());
}

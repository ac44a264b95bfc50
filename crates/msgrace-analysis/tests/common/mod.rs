//! Shared IR-building helpers for the analysis integration tests.

use msgrace_analysis::{
    detect_message_races, AnalysisContext, ConflictPair, LibraryFunc, LibraryFunctionTable,
    MemorySink, ModuleMetadata, Warning,
};
use msgrace_ir::{
    validate_module, BasicBlock, ConstPayload, Function, Handle, InstRef, Instruction, Module,
    Type, Value,
};

/// Builds small message-passing programs, one library call per statement,
/// mirroring what a compiler front end would emit.
pub struct ProgramBuilder {
    pub module: Module,
    f: Handle<Function>,
    bb: Handle<BasicBlock>,
}

#[allow(dead_code)]
impl ProgramBuilder {
    /// Starts a module with every library entry declared and a `main`
    /// function with an entry block.
    pub fn new() -> Self {
        let mut module = Module::new();
        for entry in LibraryFunc::ALL {
            module.functions.append(Function::new(entry.symbol()));
        }
        let f = module.functions.append(Function::new("main"));
        let bb = module.functions[f].blocks.append(BasicBlock::new("entry"));
        Self { module, f, bb }
    }

    /// The default communicator.
    pub fn world(&mut self) -> Value {
        self.module
            .constant(Type::Comm, ConstPayload::Named("MPI_COMM_WORLD".into()))
    }

    /// The wildcard source rank.
    pub fn any_source(&mut self) -> Value {
        self.module.const_i32(-2)
    }

    fn status_ignore(&mut self) -> Value {
        self.module
            .constant(Type::Ptr, ConstPayload::Named("MPI_STATUS_IGNORE".into()))
    }

    fn buffer(&mut self) -> Value {
        self.module.constant(Type::Ptr, ConstPayload::Undef)
    }

    /// Appends a new block to `main`.
    pub fn block(&mut self, name: &str) -> Handle<BasicBlock> {
        self.module.functions[self.f]
            .blocks
            .append(BasicBlock::new(name))
    }

    /// Moves the instruction cursor to `block`.
    pub fn switch_to(&mut self, block: Handle<BasicBlock>) {
        self.bb = block;
    }

    /// A named stack slot.
    pub fn alloca(&mut self, name: &str) -> Value {
        Value::Inst(self.module.push(
            self.f,
            self.bb,
            Instruction::Alloca {
                name: Some(name.into()),
                ty: Type::Ptr,
            },
        ))
    }

    /// An address into an aggregate, e.g. one slot of a request array.
    pub fn ptr_offset(&mut self, base: Value, offset: i32) -> Value {
        let offset = self.module.const_i32(offset);
        Value::Inst(self.module.push(
            self.f,
            self.bb,
            Instruction::PtrOffset { base, offset },
        ))
    }

    /// Terminates the current block with a branch.
    pub fn branch(&mut self, targets: &[Handle<BasicBlock>]) {
        self.module.push(
            self.f,
            self.bb,
            Instruction::Branch {
                targets: targets.to_vec(),
            },
        );
    }

    /// Terminates the current block with a return.
    pub fn ret(&mut self) {
        self.module
            .push(self.f, self.bb, Instruction::Return { value: None });
    }

    fn lib_call(&mut self, entry: LibraryFunc, args: Vec<Value>) -> InstRef {
        let callee = self
            .module
            .function_by_name(entry.symbol())
            .expect("library entries are declared up front");
        self.module
            .push(self.f, self.bb, Instruction::Call { callee, args })
    }

    /// Calls a library symbol the table does not know, declaring it on
    /// first use.
    pub fn call_named(&mut self, name: &str, args: Vec<Value>) -> InstRef {
        let callee = match self.module.function_by_name(name) {
            Some(callee) => callee,
            None => self.module.functions.append(Function::new(name)),
        };
        self.module
            .push(self.f, self.bb, Instruction::Call { callee, args })
    }

    fn transfer_args(&mut self, peer: Value, tag: i32) -> Vec<Value> {
        let buf = self.buffer();
        let count = self.module.const_i32(1);
        let dtype = self.module.const_i32(0);
        let tag = self.module.const_i32(tag);
        let world = self.world();
        vec![buf, count, dtype, peer, tag, world]
    }

    pub fn send(&mut self, dest: i32, tag: i32) -> InstRef {
        let dest = self.module.const_i32(dest);
        let args = self.transfer_args(dest, tag);
        self.lib_call(LibraryFunc::Send, args)
    }

    pub fn bsend(&mut self, dest: i32, tag: i32) -> InstRef {
        let dest = self.module.const_i32(dest);
        let args = self.transfer_args(dest, tag);
        self.lib_call(LibraryFunc::Bsend, args)
    }

    pub fn ssend(&mut self, dest: i32, tag: i32) -> InstRef {
        let dest = self.module.const_i32(dest);
        let args = self.transfer_args(dest, tag);
        self.lib_call(LibraryFunc::Ssend, args)
    }

    pub fn recv(&mut self, src: i32, tag: i32) -> InstRef {
        let src = self.module.const_i32(src);
        self.recv_from(src, tag)
    }

    /// A receive whose source is an arbitrary value (e.g. the wildcard).
    pub fn recv_from(&mut self, src: Value, tag: i32) -> InstRef {
        let mut args = self.transfer_args(src, tag);
        let status = self.status_ignore();
        args.push(status);
        self.lib_call(LibraryFunc::Recv, args)
    }

    pub fn isend(&mut self, dest: i32, tag: i32, request: Value) -> InstRef {
        let dest = self.module.const_i32(dest);
        let mut args = self.transfer_args(dest, tag);
        args.push(request);
        self.lib_call(LibraryFunc::Isend, args)
    }

    pub fn ibsend(&mut self, dest: i32, tag: i32, request: Value) -> InstRef {
        let dest = self.module.const_i32(dest);
        let mut args = self.transfer_args(dest, tag);
        args.push(request);
        self.lib_call(LibraryFunc::Ibsend, args)
    }

    pub fn irecv(&mut self, src: i32, tag: i32, request: Value) -> InstRef {
        let src = self.module.const_i32(src);
        let mut args = self.transfer_args(src, tag);
        args.push(request);
        self.lib_call(LibraryFunc::Irecv, args)
    }

    pub fn sendrecv(
        &mut self,
        dest: i32,
        send_tag: i32,
        src: i32,
        recv_tag: i32,
    ) -> InstRef {
        let sbuf = self.buffer();
        let rbuf = self.buffer();
        let count = self.module.const_i32(1);
        let dtype = self.module.const_i32(0);
        let dest = self.module.const_i32(dest);
        let stag = self.module.const_i32(send_tag);
        let src = self.module.const_i32(src);
        let rtag = self.module.const_i32(recv_tag);
        let world = self.world();
        let status = self.status_ignore();
        self.lib_call(
            LibraryFunc::Sendrecv,
            vec![
                sbuf, count, dtype, dest, stag, rbuf, count, dtype, src, rtag, world, status,
            ],
        )
    }

    pub fn wait(&mut self, request: Value) -> InstRef {
        let status = self.status_ignore();
        self.lib_call(LibraryFunc::Wait, vec![request, status])
    }

    pub fn buffer_detach(&mut self) -> InstRef {
        let buf = self.buffer();
        let size = self.buffer();
        self.lib_call(LibraryFunc::BufferDetach, vec![buf, size])
    }

    pub fn barrier(&mut self) -> InstRef {
        let world = self.world();
        self.lib_call(LibraryFunc::Barrier, vec![world])
    }

    pub fn ibarrier(&mut self, request: Value) -> InstRef {
        let world = self.world();
        self.lib_call(LibraryFunc::Ibarrier, vec![world, request])
    }

    pub fn init(&mut self) -> InstRef {
        let argc = self.buffer();
        let argv = self.buffer();
        self.lib_call(LibraryFunc::Init, vec![argc, argv])
    }

    pub fn finalize(&mut self) -> InstRef {
        self.lib_call(LibraryFunc::Finalize, vec![])
    }

    /// Validates and returns the finished module.
    pub fn finish(self) -> Module {
        validate_module(&self.module).expect("built module is well-formed");
        self.module
    }
}

/// Runs the full analysis with the module-derived oracle and a collecting
/// sink.
#[allow(dead_code)]
pub fn analyze(module: &Module) -> (Vec<ConflictPair>, Vec<Warning>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let table = LibraryFunctionTable::scan(module);
    let metadata = ModuleMetadata::compute(module, &table);
    let sink = MemorySink::new();
    let ctx = AnalysisContext {
        module,
        library: &table,
        metadata: &metadata,
        sink: &sink,
    };
    let conflicts = detect_message_races(&ctx).expect("analysis completes");
    (conflicts, sink.take())
}
